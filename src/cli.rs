use std::path::PathBuf;

use amen_bible::models::ScriptureRange;
use clap::{Args, Parser, Subcommand};
use time::Date;
use time::macros::format_description;

#[derive(Debug, Parser)]
#[command(name = "amen", version)]
#[command(about = "Daily Bible reading plan tracker")]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, global = true, env = "AMEN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Read from the store but never write to it
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show a day's reading, its video segments, your progress and everyone's totals
    Today {
        #[arg(long, value_parser = parse_date)]
        date: Option<Date>,

        /// Keep running, printing totals as they change, until interrupted
        #[arg(long)]
        follow: bool,
    },
    /// Show the video segments for scripture ranges, e.g. "GEN 1-3"
    Segments {
        #[arg(required = true, value_parser = parse_range)]
        ranges: Vec<ScriptureRange>,
    },
    /// Mark a day's reading as completed
    Complete(Mark),
    /// Like a day's reading
    Like(Mark),
    /// List every day completed this year
    Progress,
    /// Show how many readers completed and liked a day's reading
    Stats {
        #[arg(long, value_parser = parse_date)]
        date: Option<Date>,
    },
}

#[derive(Debug, Args)]
pub struct Mark {
    /// Day to mark (YYYY-MM-DD); today if omitted
    #[arg(long, value_parser = parse_date)]
    pub date: Option<Date>,

    /// Remove the mark instead of setting it
    #[arg(long)]
    pub undo: bool,
}

fn parse_date(raw: &str) -> Result<Date, String> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]")).map_err(|e| e.to_string())
}

fn parse_range(raw: &str) -> Result<ScriptureRange, String> {
    raw.parse::<ScriptureRange>().map_err(|e| (*e).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use time::macros::date;

    #[rstest]
    #[case(&["amen", "today"], None)]
    #[case(&["amen", "today", "--date", "2025-03-10"], Some(date!(2025 - 03 - 10)))]
    fn test_today(#[case] args: &[&str], #[case] expected: Option<Date>) {
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(matches!(cli.command, Command::Today { date, follow: false } if date == expected));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["amen", "complete", "--undo", "--dry-run", "-c", "amen.yaml"]).unwrap();
        assert!(cli.dry_run);
        assert_eq!(cli.config, Some(PathBuf::from("amen.yaml")));
        assert!(matches!(cli.command, Command::Complete(Mark { date: None, undo: true })));
    }

    #[test]
    fn test_segments_parses_ranges() {
        let cli = Cli::try_parse_from(["amen", "segments", "GEN 1-3", "EXO 4"]).unwrap();
        let Command::Segments { ranges } = cli.command else {
            panic!("expected segments");
        };
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[0].end_chapter(), 3);
    }

    #[rstest]
    #[case(&["amen", "segments"])]
    #[case(&["amen", "segments", "NOPE 1"])]
    #[case(&["amen", "like", "--date", "10/03/2025"])]
    fn test_rejects(#[case] args: &[&str]) {
        assert!(Cli::try_parse_from(args).is_err());
    }
}
