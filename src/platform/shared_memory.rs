//! Named shared-memory segment holding the latest [`SharedEnergyRecord`].
//!
//! Windows maps a named file mapping backed by the paging file; unix creates
//! a POSIX shared memory object. The segment is zeroed when created.

use std::ptr::{self, NonNull};

use crate::core::energy::publisher::{EnergyPublisher, SharedEnergyRecord};
use crate::error::{EcoflocError, Result};

#[cfg(windows)]
use windows_sys::Win32::Foundation::{CloseHandle, HANDLE, INVALID_HANDLE_VALUE};
#[cfg(windows)]
use windows_sys::Win32::System::Memory::{
    CreateFileMappingA, MapViewOfFile, UnmapViewOfFile, FILE_MAP_ALL_ACCESS,
    MEMORY_MAPPED_VIEW_ADDRESS, PAGE_READWRITE,
};

pub struct SharedMemoryPublisher {
    name: String,
    view: NonNull<SharedEnergyRecord>,
    #[cfg(windows)]
    mapping: HANDLE,
}

// SAFETY: the view is only written through `publish`, which the registry
// calls under its lock, and unmapped once in `Drop`.
unsafe impl Send for SharedMemoryPublisher {}
unsafe impl Sync for SharedMemoryPublisher {}

impl SharedMemoryPublisher {
    #[cfg(windows)]
    pub fn create(name: &str) -> Result<Self> {
        let c_name = std::ffi::CString::new(name)
            .map_err(|_| EcoflocError::config(format!("invalid segment name '{}'", name)))?;

        let mapping = unsafe {
            CreateFileMappingA(
                INVALID_HANDLE_VALUE,
                ptr::null(),
                PAGE_READWRITE,
                0,
                SharedEnergyRecord::SIZE as u32,
                c_name.as_ptr() as *const u8,
            )
        };
        if mapping.is_null() {
            return Err(EcoflocError::resource_acquisition(format!(
                "CreateFileMapping '{}' failed: {}",
                name,
                std::io::Error::last_os_error()
            )));
        }

        let address = unsafe {
            MapViewOfFile(mapping, FILE_MAP_ALL_ACCESS, 0, 0, SharedEnergyRecord::SIZE)
        };
        let Some(view) = NonNull::new(address.Value as *mut SharedEnergyRecord) else {
            let err = std::io::Error::last_os_error();
            unsafe { CloseHandle(mapping) };
            return Err(EcoflocError::resource_acquisition(format!(
                "MapViewOfFile '{}' failed: {}",
                name, err
            )));
        };

        let publisher = Self {
            name: name.to_string(),
            view,
            mapping,
        };
        publisher.write(&SharedEnergyRecord::default());
        log::info!("Publishing energy totals to {}", name);
        Ok(publisher)
    }

    #[cfg(unix)]
    pub fn create(name: &str) -> Result<Self> {
        let c_name = std::ffi::CString::new(name)
            .map_err(|_| EcoflocError::config(format!("invalid segment name '{}'", name)))?;
        let acquisition = |call: &str| {
            EcoflocError::resource_acquisition(format!(
                "{} '{}' failed: {}",
                call,
                name,
                std::io::Error::last_os_error()
            ))
        };

        let fd = unsafe { libc::shm_open(c_name.as_ptr(), libc::O_CREAT | libc::O_RDWR, 0o644) };
        if fd < 0 {
            return Err(acquisition("shm_open"));
        }

        if unsafe { libc::ftruncate(fd, SharedEnergyRecord::SIZE as libc::off_t) } != 0 {
            let err = acquisition("ftruncate");
            unsafe { libc::close(fd) };
            return Err(err);
        }

        let address = unsafe {
            libc::mmap(
                ptr::null_mut(),
                SharedEnergyRecord::SIZE,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd,
                0,
            )
        };
        let mapped = if address == libc::MAP_FAILED {
            Err(acquisition("mmap"))
        } else {
            Ok(address)
        };
        unsafe { libc::close(fd) };

        let view = NonNull::new(mapped? as *mut SharedEnergyRecord)
            .ok_or_else(|| acquisition("mmap"))?;

        let publisher = Self {
            name: name.to_string(),
            view,
        };
        publisher.write(&SharedEnergyRecord::default());
        log::info!("Publishing energy totals to {}", name);
        Ok(publisher)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current contents of the segment
    pub fn read(&self) -> SharedEnergyRecord {
        unsafe { ptr::read_volatile(self.view.as_ptr()) }
    }

    fn write(&self, record: &SharedEnergyRecord) {
        unsafe { ptr::write_volatile(self.view.as_ptr(), *record) }
    }
}

impl EnergyPublisher for SharedMemoryPublisher {
    fn publish(&self, record: &SharedEnergyRecord) {
        self.write(record);
    }
}

impl Drop for SharedMemoryPublisher {
    #[cfg(windows)]
    fn drop(&mut self) {
        unsafe {
            UnmapViewOfFile(MEMORY_MAPPED_VIEW_ADDRESS {
                Value: self.view.as_ptr().cast(),
            });
            CloseHandle(self.mapping);
        }
    }

    #[cfg(unix)]
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.view.as_ptr().cast(), SharedEnergyRecord::SIZE);
        }
        if let Ok(c_name) = std::ffi::CString::new(self.name.as_str()) {
            unsafe { libc::shm_unlink(c_name.as_ptr()) };
        }
    }
}
