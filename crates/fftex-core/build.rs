// intel_tex_2's ISPC kernels need the C++ standard library at link time.

fn main() {
    #[cfg(target_os = "linux")]
    println!("cargo:rustc-link-lib=stdc++");

    #[cfg(target_os = "macos")]
    println!("cargo:rustc-link-lib=c++");
}
