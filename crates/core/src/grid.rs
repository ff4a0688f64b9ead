//! Uniform periodic grid descriptor (2D or 3D).

/// Largest supported spatial dimension; unused trailing axes carry one point.
pub const MAX_DIM: usize = 3;

/// Grid coordinate, padded with zeros beyond the grid dimension.
pub type Ccoord = [usize; MAX_DIM];

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum GridError {
    #[error("only 2D and 3D grids are supported, got {0} axes")]
    UnsupportedDimension(usize),

    #[error("lengths have {lengths} entries but the grid has {dim} axes")]
    LengthMismatch { dim: usize, lengths: usize },

    #[error("axis {axis} needs at least one grid point")]
    EmptyAxis { axis: usize },

    #[error("axis {axis} has non-positive length {length}")]
    NonPositiveLength { axis: usize, length: f64 },

    #[error("subdomain description has {found} axes but the grid has {dim}")]
    SubdomainMismatch { dim: usize, found: usize },

    #[error("subdomain on axis {axis} ({location} + {nb}) exceeds the domain ({domain})")]
    SubdomainOutOfRange {
        axis: usize,
        location: usize,
        nb: usize,
        domain: usize,
    },
}

/// Immutable description of the periodic domain and of the locally owned slab.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridDescriptor {
    dim: usize,
    nb_domain_grid_pts: Ccoord,
    lengths: [f64; MAX_DIM],
    nb_subdomain_grid_pts: Ccoord,
    subdomain_locations: Ccoord,
}

impl GridDescriptor {
    pub fn new(nb_grid_pts: &[usize], lengths: &[f64]) -> Result<Self, GridError> {
        let dim = nb_grid_pts.len();
        if dim != 2 && dim != 3 {
            return Err(GridError::UnsupportedDimension(dim));
        }
        if lengths.len() != dim {
            return Err(GridError::LengthMismatch {
                dim,
                lengths: lengths.len(),
            });
        }
        let mut pts = [1; MAX_DIM];
        let mut lens = [1.0; MAX_DIM];
        for axis in 0..dim {
            if nb_grid_pts[axis] == 0 {
                return Err(GridError::EmptyAxis { axis });
            }
            if !(lengths[axis] > 0.0) || !lengths[axis].is_finite() {
                return Err(GridError::NonPositiveLength {
                    axis,
                    length: lengths[axis],
                });
            }
            pts[axis] = nb_grid_pts[axis];
            lens[axis] = lengths[axis];
        }
        Ok(Self {
            dim,
            nb_domain_grid_pts: pts,
            lengths: lens,
            nb_subdomain_grid_pts: pts,
            subdomain_locations: [0; MAX_DIM],
        })
    }

    /// Unit-length domain along every axis.
    pub fn unit(nb_grid_pts: &[usize]) -> Result<Self, GridError> {
        let lengths = vec![1.0; nb_grid_pts.len()];
        Self::new(nb_grid_pts, &lengths)
    }

    /// Restrict the locally owned portion to a slab of the domain.
    pub fn with_subdomain(
        mut self,
        nb_subdomain_grid_pts: &[usize],
        subdomain_locations: &[usize],
    ) -> Result<Self, GridError> {
        if nb_subdomain_grid_pts.len() != self.dim || subdomain_locations.len() != self.dim {
            return Err(GridError::SubdomainMismatch {
                dim: self.dim,
                found: nb_subdomain_grid_pts.len().max(subdomain_locations.len()),
            });
        }
        for axis in 0..self.dim {
            let nb = nb_subdomain_grid_pts[axis];
            let location = subdomain_locations[axis];
            let domain = self.nb_domain_grid_pts[axis];
            if location + nb > domain {
                return Err(GridError::SubdomainOutOfRange {
                    axis,
                    location,
                    nb,
                    domain,
                });
            }
            self.nb_subdomain_grid_pts[axis] = nb;
            self.subdomain_locations[axis] = location;
        }
        Ok(self)
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn nb_domain_grid_pts(&self) -> &[usize] {
        &self.nb_domain_grid_pts[..self.dim]
    }

    pub fn nb_subdomain_grid_pts(&self) -> &[usize] {
        &self.nb_subdomain_grid_pts[..self.dim]
    }

    pub fn subdomain_locations(&self) -> &[usize] {
        &self.subdomain_locations[..self.dim]
    }

    pub fn domain_lengths(&self) -> &[f64] {
        &self.lengths[..self.dim]
    }

    /// Padded grid point counts (trailing axes are 1).
    pub fn padded_domain_grid_pts(&self) -> Ccoord {
        self.nb_domain_grid_pts
    }

    pub fn padded_subdomain_grid_pts(&self) -> Ccoord {
        self.nb_subdomain_grid_pts
    }

    pub fn grid_spacing(&self, axis: usize) -> f64 {
        self.lengths[axis] / self.nb_domain_grid_pts[axis] as f64
    }

    pub fn nb_pixels(&self) -> usize {
        self.nb_domain_grid_pts.iter().product()
    }

    pub fn nb_subdomain_pixels(&self) -> usize {
        self.nb_subdomain_grid_pts.iter().product()
    }

    pub fn is_distributed(&self) -> bool {
        self.nb_subdomain_grid_pts != self.nb_domain_grid_pts
    }

    /// Linear index of a local coordinate (axis 0 fastest).
    #[inline]
    pub fn pixel_index(&self, coord: Ccoord) -> usize {
        let n = self.nb_subdomain_grid_pts;
        coord[0] + n[0] * (coord[1] + n[1] * coord[2])
    }

    /// Local coordinate of a linear pixel index.
    #[inline]
    pub fn pixel_coord(&self, index: usize) -> Ccoord {
        let n = self.nb_subdomain_grid_pts;
        [index % n[0], (index / n[0]) % n[1], index / (n[0] * n[1])]
    }

    /// Global coordinate of a local linear pixel index.
    pub fn global_pixel_coord(&self, index: usize) -> Ccoord {
        let local = self.pixel_coord(index);
        let mut global = [0; MAX_DIM];
        for axis in 0..MAX_DIM {
            global[axis] = local[axis] + self.subdomain_locations[axis];
        }
        global
    }
}
