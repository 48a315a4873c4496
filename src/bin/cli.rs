use clap::{App, Arg, SubCommand};
use memlink::{Access, RegionClient, RegionConfig, RegionKind, RegionServer, Result};

fn main() -> Result<()> {
    env_logger::init();

    let matches = App::new("memlink-cli")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Shared memory handoff over abstract unix domain sockets")
        .subcommand(
            SubCommand::with_name("serve")
                .about("Allocate a region and serve its handle to every client")
                .arg(
                    Arg::with_name("name")
                        .short("n")
                        .long("name")
                        .value_name("NAME")
                        .help("Diagnostic name of the region")
                        .required(true)
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("size")
                        .short("s")
                        .long("size")
                        .value_name("SIZE")
                        .help("Size in bytes")
                        .default_value("8")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("address")
                        .short("a")
                        .long("address")
                        .value_name("ADDRESS")
                        .help("Abstract socket address shared with clients")
                        .required(true)
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("platform-buffer")
                        .long("platform-buffer")
                        .help("Use the platform buffer backend (Android only)"),
                )
                .arg(
                    Arg::with_name("value")
                        .short("v")
                        .long("value")
                        .value_name("VALUE")
                        .help("Seed the 8-byte slot before serving")
                        .takes_value(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("fetch")
                .about("Receive a handle, map it, and read the 8-byte slot")
                .arg(
                    Arg::with_name("name")
                        .short("n")
                        .long("name")
                        .value_name("NAME")
                        .help("Diagnostic name of the region")
                        .required(true)
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("size")
                        .short("s")
                        .long("size")
                        .value_name("SIZE")
                        .help("Size in bytes agreed with the server")
                        .default_value("8")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("address")
                        .short("a")
                        .long("address")
                        .value_name("ADDRESS")
                        .help("Abstract socket address of the server")
                        .required(true)
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("platform-buffer")
                        .long("platform-buffer")
                        .help("Use the platform buffer backend (Android only)"),
                )
                .arg(
                    Arg::with_name("write")
                        .short("w")
                        .long("write")
                        .value_name("VALUE")
                        .help("Write VALUE into the slot after mapping read-write")
                        .takes_value(true),
                ),
        )
        .get_matches();

    match matches.subcommand() {
        ("serve", Some(sub)) => {
            let config = parse_config(sub)?;
            let address = sub.value_of("address").unwrap_or_default();
            let server = RegionServer::bind(config, address)?;

            if let Some(value) = sub.value_of("value") {
                let value = parse_u64("value", value)?;
                let mut view = server.map(Access::ReadWrite)?;
                view.write_u64(value)?;
                println!("Seeded slot with {}", value);
            }

            println!(
                "Serving region '{}' on '@{}' (ctrl-c to stop)",
                server.handle().name(),
                address
            );
            server.run()
        }
        ("fetch", Some(sub)) => {
            let config = parse_config(sub)?;
            let address = sub.value_of("address").unwrap_or_default();
            let client = RegionClient::new(config, address);

            if let Some(value) = sub.value_of("write") {
                let value = parse_u64("write", value)?;
                let mut acquired = client.acquire(Access::ReadWrite)?;
                acquired.view.write_u64(value)?;
                println!("Wrote {} into the shared slot", value);
            } else {
                let acquired = client.acquire(Access::ReadOnly)?;
                println!("Read {} from the shared slot", acquired.view.read_u64()?);
            }
            Ok(())
        }
        _ => {
            eprintln!("No subcommand given; try --help");
            Ok(())
        }
    }
}

fn parse_config(sub: &clap::ArgMatches) -> Result<RegionConfig> {
    let name = sub.value_of("name").unwrap_or_default();
    let size = parse_u64("size", sub.value_of("size").unwrap_or("8"))? as usize;

    let kind = if sub.is_present("platform-buffer") {
        RegionKind::PlatformBuffer
    } else {
        RegionKind::AnonymousMemory
    };
    if !kind.is_supported() {
        eprintln!("warning: {} backend is not supported here", kind.name());
    }

    Ok(RegionConfig::new(name, size).with_kind(kind))
}

fn parse_u64(parameter: &str, value: &str) -> Result<u64> {
    value
        .parse::<u64>()
        .map_err(|e| memlink::MemlinkError::invalid_parameter(parameter, e.to_string()))
}
