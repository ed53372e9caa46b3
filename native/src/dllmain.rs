// DLL entry point: process attach/detach drive the shim's lifecycle.

use std::ffi::c_void;
use windows::Win32::Foundation::HMODULE;
use windows::Win32::System::LibraryLoader::DisableThreadLibraryCalls;
use windows::Win32::System::SystemServices::{DLL_PROCESS_ATTACH, DLL_PROCESS_DETACH};

#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn DllMain(module: HMODULE, reason: u32, reserved: *mut c_void) -> i32 {
    match reason {
        DLL_PROCESS_ATTACH => {
            // Thread attach/detach notifications are not used.
            let _ = unsafe { DisableThreadLibraryCalls(module) };
            crate::attach();
        }
        // A non-null reserved pointer means the whole process is exiting.
        DLL_PROCESS_DETACH => crate::detach(!reserved.is_null()),
        _ => {}
    }
    1
}
