use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use injector_core::{
    discover, inspect, run, CrcTable, Game, InjectorError, InjectorSettings, ResourcePack,
    SaveReport, Ticket,
};

#[derive(Debug, Parser)]
#[command(
    name = "ticket-injector",
    version,
    about = "Mystery Gift event ticket injector for Emerald and FireRed/LeafGreen saves"
)]
struct Args {
    /// Log offsets and checksums while working.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write an event ticket into a save file.
    Inject {
        /// JSON settings file; cannot be combined with the other inject flags.
        #[arg(
            long,
            value_name = "JSON",
            conflicts_with_all = ["save", "game", "ticket", "resources", "output", "backup"]
        )]
        settings: Option<PathBuf>,

        #[arg(long, required_unless_present = "settings")]
        save: Option<PathBuf>,

        /// `emerald` or `frlg`.
        #[arg(long, required_unless_present = "settings")]
        game: Option<Game>,

        /// e.g. `eon_ticket`, `aurora_ticket`, `mystic_ticket`, `old_sea_map`.
        #[arg(long, required_unless_present = "settings")]
        ticket: Option<Ticket>,

        #[arg(long, default_value = "resources")]
        resources: PathBuf,

        /// Defaults to `<save>_<ticket>.sav` next to the input.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Keep a copy of the untouched save as `<save>.bak`.
        #[arg(long, default_value_t = false)]
        backup: bool,
    },

    /// Show the active slot, detected game and checksum state of a save.
    Inspect {
        #[arg(long)]
        save: PathBuf,

        /// Needed to verify the Wonder Card CRCs.
        #[arg(long)]
        resources: Option<PathBuf>,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// List the tickets each game supports.
    Tickets {
        /// Also mark which tickets are installed in this directory.
        #[arg(long)]
        resources: Option<PathBuf>,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = format!("injector_core={level}").parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn check(pair: &injector_core::patch::ChecksumPair) -> String {
    if pair.is_valid() {
        format!("{:#06x} (ok)", pair.stored)
    } else {
        format!("{:#06x} (expected {:#06x})", pair.stored, pair.computed)
    }
}

fn print_report(report: &SaveReport) {
    println!(
        "Active slot:       {} (counters {} / {})",
        report.active_slot.number(),
        report.counters[0],
        report.counters[1]
    );
    println!("Game:              {}", report.family);
    println!("Wonder Card block: {:#06x}", report.wonder_card_offset);
    println!("Detection block:   {:#06x}", report.detection_offset);
    println!("Block footer:      {}", check(&report.footer));
    match &report.wonder_card {
        Some(wc) => {
            println!("Wonder Card base:  {:#x}", wc.base);
            println!("Ticket CRC:        {}", check(&wc.ticket_crc));
            println!("Script CRC:        {}", check(&wc.script_crc));
        }
        None if report.family.game().is_none() => {
            println!("Wonder Card:       not supported by this game");
        }
        None => println!("Wonder Card:       pass --resources to verify CRCs"),
    }
}

fn run_inspect(save: &Path, resources: Option<&Path>, json: bool) -> Result<(), InjectorError> {
    let table: Option<CrcTable> = match resources {
        Some(dir) => Some(ResourcePack::open(dir)?.crc_table().clone()),
        None => None,
    };
    let bytes = fs::read(save)?;
    let report = inspect(&bytes, table.as_ref())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn run_tickets(resources: Option<&Path>) {
    let installed = resources.map(discover).unwrap_or_default();
    for game in Game::ALL {
        println!("{game} ({}):", game.slug());
        for ticket in game.tickets() {
            let marker = match resources {
                Some(_) if installed.contains(&(game, ticket)) => " [installed]",
                Some(_) => " [missing]",
                None => "",
            };
            println!("  {:<14} {}{}", ticket.slug(), ticket, marker);
        }
    }
}

fn execute(command: Command) -> Result<(), InjectorError> {
    match command {
        Command::Inject {
            settings,
            save,
            game,
            ticket,
            resources,
            output,
            backup,
        } => {
            let settings = match settings {
                Some(path) => InjectorSettings::load(&path)?,
                // clap requires save/game/ticket whenever --settings is absent.
                None => match (save, game, ticket) {
                    (Some(save_path), Some(game), Some(ticket)) => InjectorSettings {
                        game,
                        ticket,
                        save_path,
                        output_path: output,
                        resources_path: resources,
                        backup,
                    },
                    _ => {
                        return Err(InjectorError::Config(
                            "--save, --game and --ticket are required".to_string(),
                        ))
                    }
                },
            };

            let written = run(settings)?;
            println!("Wrote {}", written.display());
            Ok(())
        }
        Command::Inspect {
            save,
            resources,
            json,
        } => run_inspect(&save, resources.as_deref(), json),
        Command::Tickets { resources } => {
            run_tickets(resources.as_deref());
            Ok(())
        }
    }
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(err) = execute(args.command) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_inject_flags() {
        let args = Args::try_parse_from([
            "ticket-injector",
            "inject",
            "--save",
            "emerald.sav",
            "--game",
            "emerald",
            "--ticket",
            "old-sea-map",
            "--backup",
        ])
        .unwrap();

        match args.command {
            Command::Inject {
                game,
                ticket,
                resources,
                backup,
                output,
                ..
            } => {
                assert_eq!(game, Some(Game::Emerald));
                assert_eq!(ticket, Some(Ticket::OldSeaMap));
                assert_eq!(resources, PathBuf::from("resources"));
                assert!(backup);
                assert!(output.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn inject_requires_save_without_settings() {
        let result = Args::try_parse_from([
            "ticket-injector",
            "inject",
            "--game",
            "frlg",
            "--ticket",
            "aurora_ticket",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn settings_file_replaces_flags() {
        let args =
            Args::try_parse_from(["ticket-injector", "inject", "--settings", "run.json"]).unwrap();
        assert!(matches!(args.command, Command::Inject { settings: Some(_), .. }));

        let conflict = Args::try_parse_from([
            "ticket-injector",
            "inject",
            "--settings",
            "run.json",
            "--game",
            "frlg",
        ]);
        assert!(conflict.is_err());
    }

    #[test]
    fn settings_file_rejects_output_flags() {
        for extra in [
            &["--backup"][..],
            &["--output", "x.sav"][..],
            &["--resources", "elsewhere"][..],
        ] {
            let mut argv = vec!["ticket-injector", "inject", "--settings", "run.json"];
            argv.extend_from_slice(extra);
            assert!(Args::try_parse_from(argv).is_err(), "accepted {extra:?}");
        }
    }

    #[test]
    fn rejects_unknown_game() {
        let result = Args::try_parse_from([
            "ticket-injector",
            "inject",
            "--save",
            "x.sav",
            "--game",
            "ruby",
            "--ticket",
            "eon_ticket",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn verbose_is_global() {
        let args = Args::try_parse_from(["ticket-injector", "tickets", "-v"]).unwrap();
        assert!(args.verbose);
        assert!(matches!(args.command, Command::Tickets { resources: None }));
    }
}
