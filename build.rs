fn main() {
    // https://blog.rust-lang.org/2024/05/06/check-cfg.html#buildrs-example
    println!("cargo:rustc-check-cfg=cfg(msmpi)");

    // the mock build must not require an MPI installation
    if std::env::var_os("CARGO_FEATURE_MPI").is_none() {
        return;
    }

    let is_msmpi = match build_probe_mpi::probe() {
        Ok(lib) => lib.version == "MS-MPI",
        _ => false,
    };

    if is_msmpi {
        println!("cargo:rustc-cfg=msmpi");
    }
}
