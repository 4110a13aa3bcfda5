//! Fixed dispatch geometry for per-pixel kernels.

/// Workgroup grid covering a `width × height` image with square workgroups.
///
/// Computed once at startup from the working resolution. Threads that fall
/// outside the image (when a dimension is not a multiple of the workgroup
/// size) must not write; [`DispatchGeometry::covers`] is that bounds test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchGeometry {
    width: u32,
    height: u32,
    workgroup_size: u32,
}

impl DispatchGeometry {
    pub fn new(width: u32, height: u32, workgroup_size: u32) -> Self {
        Self {
            width,
            height,
            workgroup_size,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn workgroup_size(&self) -> u32 {
        self.workgroup_size
    }

    /// Number of workgroups along x and y.
    pub fn workgroups(&self) -> (u32, u32) {
        (
            self.width.div_ceil(self.workgroup_size),
            self.height.div_ceil(self.workgroup_size),
        )
    }

    /// Total threads launched along x and y.
    pub fn threads(&self) -> (u32, u32) {
        let (x, y) = self.workgroups();
        (x * self.workgroup_size, y * self.workgroup_size)
    }

    /// Threads that exit without writing.
    pub fn idle_threads(&self) -> u64 {
        let (tx, ty) = self.threads();
        tx as u64 * ty as u64 - self.width as u64 * self.height as u64
    }

    /// Whether the thread with global id `(x, y)` owns an output pixel.
    #[inline]
    pub fn covers(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height
    }

    /// Record the dispatch into a compute pass.
    pub fn dispatch(&self, pass: &mut wgpu::ComputePass<'_>) {
        let (x, y) = self.workgroups();
        pass.dispatch_workgroups(x, y, 1);
    }
}
