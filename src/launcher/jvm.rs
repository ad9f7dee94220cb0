//! In-process JVM launch through the JNI invocation API
//!
//! The runtime library is loaded, `JNI_CreateJavaVM` is called with the JAR on
//! the class path, and the main class's `static void main(String[])` is
//! invoked on the worker thread. The VM is destroyed and the library released
//! on every path.

use log::{debug, info};
use std::ffi::CString;
use std::path::{Path, PathBuf};

use super::library::DynamicLibrary;
use crate::exceptions::{JarpackError, Result};
use crate::format::java_version;

pub const CREATE_VM_SYMBOL: &str = "JNI_CreateJavaVM";
pub const MAIN_METHOD: &str = "main";
pub const MAIN_SIGNATURE: &str = "([Ljava/lang/String;)V";

/// Used when the package does not name a version
pub const FALLBACK_JNI_VERSION: u32 = 0x0001_0008;

const JNI_OK: i32 = 0;

// JNINativeInterface function table slots
const FIND_CLASS: usize = 6;
const EXCEPTION_DESCRIBE: usize = 16;
const EXCEPTION_CLEAR: usize = 17;
const DELETE_LOCAL_REF: usize = 23;
const GET_STATIC_METHOD_ID: usize = 113;
const CALL_STATIC_VOID_METHOD_A: usize = 143;
const NEW_STRING_UTF: usize = 167;
const NEW_OBJECT_ARRAY: usize = 172;
const SET_OBJECT_ARRAY_ELEMENT: usize = 174;
const EXCEPTION_CHECK: usize = 228;

// JNIInvokeInterface slot
const DESTROY_JAVA_VM: usize = 3;

/// What to run inside the VM
#[derive(Debug, Clone)]
pub struct JvmLaunch {
    pub library: PathBuf,
    pub jar: PathBuf,
    /// JNI version tag from the footer
    pub version: u32,
    pub main_class: String,
    pub jvm_args: Vec<String>,
    pub program_args: Vec<String>,
}

/// Version requested from `JNI_CreateJavaVM`
pub fn effective_version(tag: u32) -> u32 {
    if tag == java_version::UNSPECIFIED {
        FALLBACK_JNI_VERSION
    } else {
        tag
    }
}

/// VM options: the class path first, then the packaged JVM arguments
pub fn vm_options(jar: &Path, jvm_args: &[String]) -> Vec<String> {
    let mut options = Vec::with_capacity(jvm_args.len() + 1);
    options.push(format!("-Djava.class.path={}", jar.display()));
    options.extend(jvm_args.iter().cloned());
    options
}

/// `com.example.Main` -> `com/example/Main`
pub fn class_binary_name(main_class: &str) -> String {
    main_class.trim().replace('.', "/")
}

fn c_string(value: &str, what: &str) -> Result<CString> {
    CString::new(value)
        .map_err(|_| JarpackError::InvalidFormat(format!("{what} contains a NUL byte: {value:?}")))
}

/// Load the runtime library and run the main class to completion
pub fn invoke_main(launch: &JvmLaunch) -> Result<()> {
    if launch.main_class.trim().is_empty() {
        return Err(JarpackError::MainClassNotFound(
            "no main class recorded in the package".into(),
        ));
    }

    let options = vm_options(&launch.jar, &launch.jvm_args)
        .iter()
        .map(|option| c_string(option, "JVM option"))
        .collect::<Result<Vec<_>>>()?;
    let class_name = c_string(&class_binary_name(&launch.main_class), "main class")?;
    let program_args = launch
        .program_args
        .iter()
        .map(|arg| c_string(arg, "program argument"))
        .collect::<Result<Vec<_>>>()?;

    let library = DynamicLibrary::open(&launch.library)?;
    let create = library.symbol(CREATE_VM_SYMBOL).ok_or_else(|| {
        JarpackError::EntryPointMissing(format!(
            "{CREATE_VM_SYMBOL} in {}",
            library.path().display()
        ))
    })?;

    let version = effective_version(launch.version);
    debug!(
        "☕ Creating JVM (version 0x{version:08x}) with {} options",
        options.len()
    );
    let vm = ffi::JavaVm::create(create, version, &options)?;
    info!("☕ JVM created, invoking {}.main", launch.main_class);
    let result = vm.call_main(&class_name, &program_args, &launch.main_class);
    drop(vm);
    drop(library);
    result
}

#[allow(unsafe_code)] // Required for JNI FFI calls
mod ffi {
    use super::{
        CALL_STATIC_VOID_METHOD_A, DELETE_LOCAL_REF, DESTROY_JAVA_VM, EXCEPTION_CHECK,
        EXCEPTION_CLEAR, EXCEPTION_DESCRIBE, FIND_CLASS, GET_STATIC_METHOD_ID, JNI_OK, MAIN_METHOD,
        MAIN_SIGNATURE, NEW_OBJECT_ARRAY, NEW_STRING_UTF, SET_OBJECT_ARRAY_ELEMENT, c_string,
    };
    use crate::exceptions::{JarpackError, Result};
    use log::{debug, warn};
    use std::ffi::{CString, c_char, c_void};
    use std::ptr;

    type JInt = i32;
    type JSize = i32;
    type JBoolean = u8;
    type JObject = *mut c_void;
    type JMethodId = *mut c_void;
    type FunctionTable = *const *const c_void;

    #[repr(C)]
    struct JavaVmOption {
        option_string: *mut c_char,
        extra_info: *mut c_void,
    }

    #[repr(C)]
    struct JavaVmInitArgs {
        version: JInt,
        n_options: JInt,
        options: *mut JavaVmOption,
        ignore_unrecognized: JBoolean,
    }

    // jvalue is 64 bits wide on every target
    #[repr(C)]
    union JValue {
        l: JObject,
        #[allow(dead_code)]
        j: i64,
    }

    type CreateJavaVmFn =
        unsafe extern "system" fn(*mut *mut FunctionTable, *mut *mut c_void, *mut c_void) -> JInt;
    type DestroyJavaVmFn = unsafe extern "system" fn(*mut FunctionTable) -> JInt;
    type FindClassFn = unsafe extern "system" fn(*mut FunctionTable, *const c_char) -> JObject;
    type VoidFn = unsafe extern "system" fn(*mut FunctionTable);
    type ExceptionCheckFn = unsafe extern "system" fn(*mut FunctionTable) -> JBoolean;
    type DeleteLocalRefFn = unsafe extern "system" fn(*mut FunctionTable, JObject);
    type GetStaticMethodIdFn = unsafe extern "system" fn(
        *mut FunctionTable,
        JObject,
        *const c_char,
        *const c_char,
    ) -> JMethodId;
    type CallStaticVoidMethodAFn =
        unsafe extern "system" fn(*mut FunctionTable, JObject, JMethodId, *const JValue);
    type NewStringUtfFn = unsafe extern "system" fn(*mut FunctionTable, *const c_char) -> JObject;
    type NewObjectArrayFn =
        unsafe extern "system" fn(*mut FunctionTable, JSize, JObject, JObject) -> JObject;
    type SetObjectArrayElementFn =
        unsafe extern "system" fn(*mut FunctionTable, JObject, JSize, JObject);

    /// A created VM plus the attached thread's environment. Dropping it
    /// destroys the VM.
    pub(super) struct JavaVm {
        vm: *mut FunctionTable,
        env: *mut FunctionTable,
    }

    /// Fetch slot `index` of a JNI function table as `F`
    unsafe fn slot<F: Copy>(table: *mut FunctionTable, index: usize) -> F {
        unsafe {
            let entry = (*table).add(index);
            std::mem::transmute_copy::<*const c_void, F>(&*entry)
        }
    }

    impl JavaVm {
        pub(super) fn create(
            entry_point: *mut c_void,
            version: u32,
            options: &[CString],
        ) -> Result<Self> {
            let mut vm_options: Vec<JavaVmOption> = options
                .iter()
                .map(|option| JavaVmOption {
                    option_string: option.as_ptr() as *mut c_char,
                    extra_info: ptr::null_mut(),
                })
                .collect();
            let mut init_args = JavaVmInitArgs {
                version: version as JInt,
                n_options: vm_options.len() as JInt,
                options: vm_options.as_mut_ptr(),
                ignore_unrecognized: 0,
            };

            let mut vm: *mut FunctionTable = ptr::null_mut();
            let mut env: *mut c_void = ptr::null_mut();
            let status = unsafe {
                let create: CreateJavaVmFn = std::mem::transmute(entry_point);
                create(
                    &mut vm,
                    &mut env,
                    &mut init_args as *mut JavaVmInitArgs as *mut c_void,
                )
            };
            if status != JNI_OK || vm.is_null() || env.is_null() {
                return Err(JarpackError::VmCreationFailed(status));
            }
            Ok(JavaVm {
                vm,
                env: env as *mut FunctionTable,
            })
        }

        /// Print and clear a pending exception; true when one was pending
        fn take_exception(&self) -> bool {
            unsafe {
                let check: ExceptionCheckFn = slot(self.env, EXCEPTION_CHECK);
                if check(self.env) == 0 {
                    return false;
                }
                let describe: VoidFn = slot(self.env, EXCEPTION_DESCRIBE);
                describe(self.env);
                let clear: VoidFn = slot(self.env, EXCEPTION_CLEAR);
                clear(self.env);
            }
            true
        }

        fn find_class(&self, name: &CString) -> JObject {
            unsafe {
                let find_class: FindClassFn = slot(self.env, FIND_CLASS);
                find_class(self.env, name.as_ptr())
            }
        }

        fn string_array(&self, items: &[CString]) -> Result<JObject> {
            let string_class = self.find_class(&c_string("java/lang/String", "class name")?);
            if string_class.is_null() {
                self.take_exception();
                return Err(JarpackError::MainClassNotFound("java/lang/String".into()));
            }
            unsafe {
                let new_array: NewObjectArrayFn = slot(self.env, NEW_OBJECT_ARRAY);
                let new_string: NewStringUtfFn = slot(self.env, NEW_STRING_UTF);
                let set_element: SetObjectArrayElementFn = slot(self.env, SET_OBJECT_ARRAY_ELEMENT);
                let delete_ref: DeleteLocalRefFn = slot(self.env, DELETE_LOCAL_REF);

                let array = new_array(
                    self.env,
                    items.len() as JSize,
                    string_class,
                    ptr::null_mut(),
                );
                if array.is_null() {
                    self.take_exception();
                    return Err(JarpackError::InvocationThrew(
                        "could not allocate the argument array".into(),
                    ));
                }
                for (index, item) in items.iter().enumerate() {
                    let value = new_string(self.env, item.as_ptr());
                    set_element(self.env, array, index as JSize, value);
                    delete_ref(self.env, value);
                }
                delete_ref(self.env, string_class);
                Ok(array)
            }
        }

        pub(super) fn call_main(
            &self,
            class_name: &CString,
            program_args: &[CString],
            display_name: &str,
        ) -> Result<()> {
            let main_class = self.find_class(class_name);
            if main_class.is_null() {
                self.take_exception();
                return Err(JarpackError::MainClassNotFound(display_name.to_string()));
            }

            let method_name = c_string(MAIN_METHOD, "method name")?;
            let signature = c_string(MAIN_SIGNATURE, "method signature")?;
            let main_method = unsafe {
                let get_method: GetStaticMethodIdFn = slot(self.env, GET_STATIC_METHOD_ID);
                get_method(self.env, main_class, method_name.as_ptr(), signature.as_ptr())
            };
            if main_method.is_null() {
                self.take_exception();
                return Err(JarpackError::MainMethodNotFound(format!(
                    "{display_name}.{MAIN_METHOD}{MAIN_SIGNATURE}"
                )));
            }

            let args = self.string_array(program_args)?;
            unsafe {
                let call: CallStaticVoidMethodAFn = slot(self.env, CALL_STATIC_VOID_METHOD_A);
                let arguments = [JValue { l: args }];
                call(self.env, main_class, main_method, arguments.as_ptr());
            }
            if self.take_exception() {
                return Err(JarpackError::InvocationThrew(format!(
                    "{display_name}.main threw an exception"
                )));
            }
            debug!("☕ {display_name}.main returned");
            Ok(())
        }
    }

    impl Drop for JavaVm {
        fn drop(&mut self) {
            let status = unsafe {
                let destroy: DestroyJavaVmFn = slot(self.vm, DESTROY_JAVA_VM);
                destroy(self.vm)
            };
            if status != JNI_OK {
                warn!("⚠️ DestroyJavaVM returned {status}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_unspecified_version_falls_back() {
        assert_eq!(effective_version(0), FALLBACK_JNI_VERSION);
        assert_eq!(effective_version(0x0015_0000), 0x0015_0000);
    }

    #[test]
    fn test_vm_options_put_class_path_first() {
        let options = vm_options(
            Path::new("app.jar"),
            &["-Xmx512m".to_string(), "-Dfoo=bar".to_string()],
        );
        assert_eq!(
            options,
            vec!["-Djava.class.path=app.jar", "-Xmx512m", "-Dfoo=bar"]
        );
    }

    #[test]
    fn test_class_binary_name() {
        assert_eq!(class_binary_name("com.example.Main"), "com/example/Main");
        assert_eq!(class_binary_name(" Main "), "Main");
    }

    #[test]
    fn test_missing_main_class_is_reported_before_loading() {
        let launch = JvmLaunch {
            library: PathBuf::from("does-not-matter"),
            jar: PathBuf::from("app.jar"),
            version: 0,
            main_class: "  ".into(),
            jvm_args: Vec::new(),
            program_args: Vec::new(),
        };
        assert!(matches!(
            invoke_main(&launch),
            Err(JarpackError::MainClassNotFound(_))
        ));
    }

    #[test]
    fn test_unloadable_library() {
        let temp_dir = TempDir::new().unwrap();
        let launch = JvmLaunch {
            library: temp_dir.path().join("jvm-missing"),
            jar: temp_dir.path().join("app.jar"),
            version: 0x0001_0008,
            main_class: "Main".into(),
            jvm_args: vec!["-Xmx64m".into()],
            program_args: vec!["a".into()],
        };
        assert!(matches!(
            invoke_main(&launch),
            Err(JarpackError::LibraryLoadFailed(_))
        ));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_library_without_entry_point() {
        let launch = JvmLaunch {
            library: PathBuf::from("libc.so.6"),
            jar: PathBuf::from("app.jar"),
            version: 0,
            main_class: "Main".into(),
            jvm_args: Vec::new(),
            program_args: Vec::new(),
        };
        assert!(matches!(
            invoke_main(&launch),
            Err(JarpackError::EntryPointMissing(_))
        ));
    }

    #[test]
    fn test_nul_in_arguments_is_rejected() {
        let launch = JvmLaunch {
            library: PathBuf::from("jvm"),
            jar: PathBuf::from("app.jar"),
            version: 0,
            main_class: "Main".into(),
            jvm_args: Vec::new(),
            program_args: vec!["bad\0arg".into()],
        };
        assert!(matches!(
            invoke_main(&launch),
            Err(JarpackError::InvalidFormat(_))
        ));
    }
}
