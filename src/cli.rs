use clap::{Arg, ArgAction, Command};
use log::debug;

pub fn build_cli() -> Command {
    debug!("⚙️ Building CLI interface...");
    Command::new("hubrec")
        .version("0.1.0")
        .about("Downloads recorded video from cameras behind Tapo hubs, one recording at a time.")
        .arg(
            Arg::new("config-dir")
                .short('c')
                .long("config-dir")
                .value_name("DIR")
                .help("Directory holding one *.json hub configuration per hub (default: ./configs/)")
                .action(ArgAction::Set)
                .global(true),
        )
        .arg(
            Arg::new("ffmpeg")
                .long("ffmpeg")
                .value_name("PATH")
                .help("ffmpeg binary used to remux downloads to mp4 (default: ffmpeg)")
                .action(ArgAction::Set)
                .global(true),
        )
        .arg(
            Arg::new("debug")
                .short('d')
                .long("debug")
                .help("Enable debug logging")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(Command::new("download").about("Downloads every recording of every supported camera (default)"))
        .subcommand(Command::new("list").about("Lists recordings without downloading them"))
}
