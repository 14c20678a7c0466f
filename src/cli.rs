use clap::{Arg, ArgAction, ArgMatches, ColorChoice, Command};

pub struct Cli {
    /// Arguments passed by user
    matches: ArgMatches,
}

impl Cli {
    /// Build new command line interface
    pub fn new() -> Self {
        Self {
            matches: {
                Command::new("bistatic-telemetry")
                    .version(env!("CARGO_PKG_VERSION"))
                    .about("Target position and velocity from simultaneous bistatic radar detections")
                    .arg_required_else_help(true)
                    .color(ColorChoice::Auto)
                    .arg(
                        Arg::new("input")
                            .value_name("INPUT")
                            .help("JSON file holding detection1, detection2 and optionally detection3")
                            .required(true),
                    )
                    .arg(
                        Arg::new("config")
                            .short('c')
                            .long("config")
                            .value_name("FILE")
                            .help("Solver configuration (JSON). Defaults are used when omitted."),
                    )
                    .arg(
                        Arg::new("compact")
                            .long("compact")
                            .action(ArgAction::SetTrue)
                            .help("Print the result on a single line"),
                    )
                    .get_matches()
            },
        }
    }

    pub fn input_path(&self) -> &str {
        // mandatory argument, clap exits before we get here without it
        self.matches.get_one::<String>("input").map(String::as_str).unwrap_or_default()
    }

    pub fn config_path(&self) -> Option<&String> {
        self.matches.get_one::<String>("config")
    }

    pub fn compact(&self) -> bool {
        self.matches.get_flag("compact")
    }
}
