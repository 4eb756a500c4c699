fn main() {
    if std::env::var_os("PROTOC").is_none() {
        std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path().unwrap());
    }

    // Compile all proto files for the service mesh.
    // Both client and server stubs are generated here so individual
    // services share one codegen site.
    let base = "../../../proto";
    let services = vec![
        ("auth_service", format!("{}/auth_service.proto", base)),
        ("parser_service", format!("{}/parser_service.proto", base)),
        ("asset_service", format!("{}/asset_service.proto", base)),
        (
            "downloader_service",
            format!("{}/downloader_service.proto", base),
        ),
    ];

    for (service_name, proto_path) in services {
        tonic_build::configure()
            .build_server(true)
            .build_client(true)
            .compile(&[proto_path.as_str()], &[base])
            .unwrap_or_else(|e| panic!("Failed to compile {}: {}", service_name, e));
    }

    println!("cargo:rerun-if-changed=../../../proto/");
}
