//! Host-visible device buffers: a thin wrapper over the accelerator's DRAM
//! allocator, standing in for a host library's `AllocBuffer`/`FreeBuffer`/
//! `CopyToDevice`/`CopyToHost` C-ABI entry points.

use std::sync::Arc;

use tvacc_core::accelerator::Accelerator;
use tvacc_core::elem::Elem;
use tvacc_core::error::ResourceError;

/// A device-memory handle: a byte offset into the accelerator's DRAM.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DevicePtr(pub u32);

pub fn alloc_buffer(accel: &Arc<Accelerator>, nbytes: u32) -> Result<DevicePtr, ResourceError> {
    accel.dram_alloc(nbytes).map(DevicePtr)
}

pub fn free_buffer(accel: &Arc<Accelerator>, ptr: DevicePtr) -> Result<(), ResourceError> {
    accel.dram_free(ptr.0)
}

/// Copy `src` into device DRAM at `dst`, reinterpreting as `T`.
pub fn copy_to_device<T: Elem>(
    accel: &Arc<Accelerator>,
    dst: DevicePtr,
    src: &[T],
) -> Result<(), ResourceError> {
    let out = accel.slice_mut::<T>(dst.0 as u64, src.len())?;
    out.copy_from_slice(src);
    Ok(())
}

/// Copy `dst.len()` elements of `T` out of device DRAM at `src` into `dst`.
pub fn copy_to_host<T: Elem>(
    accel: &Arc<Accelerator>,
    dst: &mut [T],
    src: DevicePtr,
) -> Result<(), ResourceError> {
    let inp = accel.slice::<T>(src.0 as u64, dst.len())?;
    dst.copy_from_slice(inp);
    Ok(())
}
