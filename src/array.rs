//! N-D (1/2/3 dimensional) regular grid buffer, generalizing `Array2D` to the
//! dimensionality and element types the refactor pipeline needs.

use bytemuck::Zeroable;

use crate::error::Error;

/// The pipeline only ever deals with 1D, 2D, or 3D grids.
pub const MAX_DIMS: usize = 3;

/// Row-major dimensions of an N-D grid, N in 1..=3.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dims {
    ndim: usize,
    dims: [u32; MAX_DIMS],
}

impl Dims {
    pub fn new(dims: &[u32]) -> Result<Self, Error> {
        if dims.is_empty() || dims.len() > MAX_DIMS {
            return Err(Error::InvalidArgument(format!(
                "num_dims must be in 1..={MAX_DIMS}, got {}",
                dims.len()
            )));
        }
        if dims.iter().any(|&d| d == 0) {
            return Err(Error::InvalidArgument("dimensions must be nonzero".into()));
        }
        let mut buf = [1u32; MAX_DIMS];
        buf[..dims.len()].copy_from_slice(dims);
        Ok(Self { ndim: dims.len(), dims: buf })
    }

    pub fn ndim(&self) -> usize {
        self.ndim
    }

    /// The dimensions in row-major order, slowest-varying axis first.
    pub fn as_slice(&self) -> &[u32] {
        &self.dims[..self.ndim]
    }

    pub fn axis_len(&self, axis: usize) -> u32 {
        self.dims[axis]
    }

    pub fn num_elements(&self) -> usize {
        self.as_slice().iter().map(|&d| d as usize).product()
    }

    /// Row-major strides, in elements, for each axis.
    pub fn strides(&self) -> [usize; MAX_DIMS] {
        let mut strides = [0usize; MAX_DIMS];
        let mut acc = 1usize;
        for axis in (0..self.ndim).rev() {
            strides[axis] = acc;
            acc *= self.dims[axis] as usize;
        }
        strides
    }

    pub fn min_axis_len(&self) -> u32 {
        self.as_slice().iter().copied().min().unwrap()
    }
}

/// An owned, row-major N-D array of floating-point samples.
#[derive(Clone)]
pub struct Array<F> {
    dims: Dims,
    data: Box<[F]>,
}

impl<F: Copy + Zeroable> Array<F> {
    pub fn zeroed(dims: Dims) -> Self {
        let n = dims.num_elements();
        Self { dims, data: bytemuck::allocation::zeroed_slice_box(n) }
    }

    pub fn from_vec(dims: Dims, data: Vec<F>) -> Result<Self, Error> {
        if data.len() != dims.num_elements() {
            return Err(Error::InvalidArgument(format!(
                "data has {} elements, dims describe {}",
                data.len(),
                dims.num_elements()
            )));
        }
        Ok(Self { dims, data: data.into_boxed_slice() })
    }

    pub fn dims(&self) -> Dims {
        self.dims
    }

    pub fn as_slice(&self) -> &[F] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [F] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<F> {
        self.data.into_vec()
    }
}
