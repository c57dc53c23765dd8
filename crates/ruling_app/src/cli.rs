use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;
use log::LevelFilter;
use ruling_core::{DateWindow, DateWindowError};

use crate::logging::LogDestination;

/// Downloads and restructures Supreme Court civil rulings published in a date range.
#[derive(Debug, Parser)]
#[command(name = "ruling-harvester", version)]
pub struct Args {
    /// First ruling date to search, YYYY-MM-DD.
    #[arg(short, long)]
    pub start: NaiveDate,
    /// Last ruling date to search (inclusive), YYYY-MM-DD.
    #[arg(short, long)]
    pub end: NaiveDate,
    /// Directory the rulings are written to.
    #[arg(short, long, default_value = "downloads")]
    pub destination: PathBuf,
    /// RON file overriding pool, browser, portal, fetch and output settings.
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Also write the log to this file.
    #[arg(long)]
    pub log_file: Option<PathBuf>,
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn window(&self) -> Result<DateWindow, DateWindowError> {
        DateWindow::new(self.start, self.end)
    }

    pub fn level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }

    pub fn log_destination(&self) -> LogDestination {
        match &self.log_file {
            Some(path) => LogDestination::Both(path.clone()),
            None => LogDestination::Terminal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("ruling-harvester").chain(args.iter().copied()))
    }

    #[test]
    fn destination_defaults_to_downloads() {
        let args = parse(&["-s", "2020-01-01", "-e", "2020-01-31"]).unwrap();
        assert_eq!(args.destination, PathBuf::from("downloads"));
        assert_eq!(args.level(), LevelFilter::Info);
        assert!(matches!(args.log_destination(), LogDestination::Terminal));
        let window = args.window().unwrap();
        assert_eq!(window.start(), NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        assert_eq!(window.end(), NaiveDate::from_ymd_opt(2020, 1, 31).unwrap());
    }

    #[test]
    fn malformed_dates_are_rejected_while_parsing() {
        assert!(parse(&["--start", "2020-13-01", "--end", "2020-12-31"]).is_err());
        assert!(parse(&["--start", "2020/01/01", "--end", "2020-12-31"]).is_err());
        assert!(parse(&["--start", "2020-01-01"]).is_err());
    }

    #[test]
    fn reversed_window_is_rejected_before_crawling() {
        let args = parse(&["--start", "2020-02-01", "--end", "2020-01-01"]).unwrap();
        assert!(matches!(args.window(), Err(DateWindowError::Reversed { .. })));
    }

    #[test]
    fn verbose_and_log_file_are_honoured() {
        let args = parse(&[
            "-s", "2020-01-01", "-e", "2020-01-02", "-v", "--log-file", "crawl.log", "-d", "out",
        ])
        .unwrap();
        assert_eq!(args.level(), LevelFilter::Debug);
        assert_eq!(args.destination, PathBuf::from("out"));
        assert!(matches!(
            args.log_destination(),
            LogDestination::Both(path) if path == PathBuf::from("crawl.log")
        ));
    }
}
