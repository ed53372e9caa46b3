// Build script to embed Windows version resources into saapi.dll.

fn main() {
    // Only compile resources on Windows.
    #[cfg(target_os = "windows")]
    {
        let mut res = winres::WindowsResource::new();
        res.set("FileDescription", "Screen reader API pipe bridge");
        res.set("ProductName", "saapi-bridge");
        res.set("OriginalFilename", "saapi.dll");

        if let Err(e) = res.compile() {
            eprintln!("Warning: Failed to compile Windows resources: {}", e);
            eprintln!("saapi.dll will not carry version information.");
        }
    }

    println!("cargo:rerun-if-changed=build.rs");
}
