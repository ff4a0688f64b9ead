//! Contiguous real-valued tensor field storage on the local pixels of a grid.
//!
//! Every pixel owns `nb_components` consecutive entries. Second-order tensors
//! are stored row-major (`ij -> i * dim + j`), fourth-order tensors use
//! [`crate::tensor::t4_offset`].

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    nb_pixels: usize,
    nb_components: usize,
    data: Vec<f64>,
}

impl Field {
    pub fn zeros(nb_pixels: usize, nb_components: usize) -> Self {
        Self {
            nb_pixels,
            nb_components,
            data: vec![0.0; nb_pixels * nb_components],
        }
    }

    pub fn from_vec(nb_pixels: usize, nb_components: usize, data: Vec<f64>) -> Self {
        assert_eq!(
            data.len(),
            nb_pixels * nb_components,
            "data length must match pixel and component counts"
        );
        Self {
            nb_pixels,
            nb_components,
            data,
        }
    }

    /// Field holding the same per-pixel value everywhere.
    pub fn uniform(nb_pixels: usize, value: &[f64]) -> Self {
        let mut field = Self::zeros(nb_pixels, value.len());
        for pixel in field.pixels_mut() {
            pixel.copy_from_slice(value);
        }
        field
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn nb_pixels(&self) -> usize {
        self.nb_pixels
    }

    pub fn nb_components(&self) -> usize {
        self.nb_components
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn pixel(&self, index: usize) -> &[f64] {
        let start = index * self.nb_components;
        &self.data[start..start + self.nb_components]
    }

    pub fn pixel_mut(&mut self, index: usize) -> &mut [f64] {
        let start = index * self.nb_components;
        &mut self.data[start..start + self.nb_components]
    }

    pub fn pixels(&self) -> std::slice::ChunksExact<'_, f64> {
        self.data.chunks_exact(self.nb_components.max(1))
    }

    pub fn pixels_mut(&mut self) -> std::slice::ChunksExactMut<'_, f64> {
        self.data.chunks_exact_mut(self.nb_components.max(1))
    }

    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    /// Sum of the per-pixel values over the local pixels.
    pub fn local_sum(&self) -> Vec<f64> {
        let mut total = vec![0.0; self.nb_components];
        for pixel in self.pixels() {
            for (acc, value) in total.iter_mut().zip(pixel) {
                *acc += value;
            }
        }
        total
    }
}

impl From<Field> for Vec<f64> {
    fn from(field: Field) -> Self {
        field.data
    }
}
