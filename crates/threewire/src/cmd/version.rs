use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("threewire {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: threewire");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!(
        "features: link={}, async={}, serial={}, cli=true",
        cfg!(feature = "link"),
        cfg!(feature = "async"),
        cfg!(feature = "serial")
    );
    println!(
        "defaults: tx_window={}, queue_capacity={}, max_out_of_order={}",
        threewire_link::config::DEFAULT_TX_WINDOW,
        threewire_link::config::DEFAULT_QUEUE_CAPACITY,
        threewire_link::config::DEFAULT_MAX_OUT_OF_ORDER
    );

    Ok(SUCCESS)
}
