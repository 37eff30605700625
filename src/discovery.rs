use std::env;
use std::path::PathBuf;

pub(crate) fn default_library_candidates() -> &'static [&'static str] {
    #[cfg(target_os = "windows")]
    {
        &["libmecab.dll", "mecab.dll"]
    }
    #[cfg(target_os = "macos")]
    {
        &[
            "libmecab.dylib",
            "libmecab.2.dylib",
            "/usr/local/lib/libmecab.dylib",
            "/opt/homebrew/lib/libmecab.dylib",
            "@rpath/libmecab.dylib",
            "@loader_path/libmecab.dylib",
        ]
    }
    #[cfg(all(unix, not(target_os = "macos")))]
    {
        &[
            "libmecab.so.2",
            "libmecab.so",
            "./libmecab.so",
            "/usr/local/lib/libmecab.so",
            "/usr/lib/libmecab.so.2",
        ]
    }
}

#[cfg(target_os = "windows")]
fn well_known_library_paths() -> Vec<PathBuf> {
    vec![
        PathBuf::from("C:\\Program Files\\MeCab\\bin\\libmecab.dll"),
        PathBuf::from("C:\\Program Files (x86)\\MeCab\\bin\\libmecab.dll"),
    ]
}

#[cfg(target_os = "macos")]
fn well_known_library_paths() -> Vec<PathBuf> {
    vec![
        PathBuf::from("/usr/local/lib/libmecab.dylib"),
        PathBuf::from("/opt/homebrew/lib/libmecab.dylib"),
        PathBuf::from("/opt/local/lib/libmecab.dylib"),
    ]
}

#[cfg(all(unix, not(target_os = "macos")))]
fn well_known_library_paths() -> Vec<PathBuf> {
    vec![
        PathBuf::from("/usr/local/lib/libmecab.so"),
        PathBuf::from("/usr/lib/x86_64-linux-gnu/libmecab.so.2"),
        PathBuf::from("/usr/lib/aarch64-linux-gnu/libmecab.so.2"),
        PathBuf::from("/usr/lib64/libmecab.so.2"),
        PathBuf::from("/usr/lib/libmecab.so.2"),
    ]
}

pub(crate) fn discover_default_library_path() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        if let Some(local_app_data) = env::var_os("LOCALAPPDATA") {
            let path = PathBuf::from(local_app_data)
                .join("MeCab")
                .join("bin")
                .join("libmecab.dll");
            if path.exists() {
                return Some(path);
            }
        }
    }

    #[cfg(not(target_os = "windows"))]
    {
        if let Some(home) = env::var_os("HOME") {
            #[cfg(target_os = "macos")]
            let file_name = "libmecab.dylib";
            #[cfg(all(unix, not(target_os = "macos")))]
            let file_name = "libmecab.so";

            let path = PathBuf::from(home)
                .join(".local")
                .join("lib")
                .join(file_name);
            if path.exists() {
                return Some(path);
            }
        }
    }

    well_known_library_paths()
        .into_iter()
        .find(|path| path.exists())
}
