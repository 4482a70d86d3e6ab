use clap::Parser;
use oscar::Cli;
use oscar::oscar_fmt_xml::oscar_core::Outcome;

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    match cli.run() {
        Ok(Outcome::Success) => {}
        Ok(_) => std::process::exit(1),
        Err(err) => {
            println!("ERROR: {err:#}");
            std::process::exit(2);
        }
    }
}
