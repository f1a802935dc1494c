//! OS-level thread description lookup.

/// Returns the OS description of the calling thread, when one is set.
#[cfg(windows)]
pub(crate) fn current_thread_description() -> Option<String> {
    use std::os::raw::c_char;
    use winapi::shared::ntdef::{HRESULT, PWSTR};
    use winapi::um::libloaderapi::{GetModuleHandleA, GetProcAddress};
    use winapi::um::processthreadsapi::GetCurrentThread;
    use winapi::um::winbase::LocalFree;
    use winapi::um::winnt::HANDLE;

    type PfnGetThreadDescription =
        unsafe extern "system" fn(thread: HANDLE, description: *mut PWSTR) -> HRESULT;

    unsafe {
        // Win10 1607+; resolved dynamically so older kernels still load us.
        let kernel32 = GetModuleHandleA(b"kernel32.dll\0".as_ptr() as *const c_char);
        if kernel32.is_null() {
            return None;
        }
        let proc = GetProcAddress(kernel32, b"GetThreadDescription\0".as_ptr() as *const c_char);
        if proc.is_null() {
            return None;
        }
        let get_thread_description: PfnGetThreadDescription = std::mem::transmute(proc);

        let mut wide: PWSTR = std::ptr::null_mut();
        let hr = get_thread_description(GetCurrentThread(), &mut wide);
        if hr < 0 || wide.is_null() {
            return None;
        }

        let mut name = String::new();
        let mut p = wide;
        while *p != 0 {
            if *p < 128 {
                name.push(*p as u8 as char);
            }
            p = p.add(1);
        }
        LocalFree(wide as *mut _);

        if name.is_empty() {
            None
        } else {
            Some(name)
        }
    }
}

#[cfg(not(windows))]
pub(crate) fn current_thread_description() -> Option<String> {
    std::thread::current().name().map(str::to_owned)
}
