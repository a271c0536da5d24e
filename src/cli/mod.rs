//! `pnl-journal` command line.
//!
//! ```bash
//! # Log a day
//! pnl-journal add 2025-01-02 --realized 1250.50 --paper -300 --notes "ORB long"
//!
//! # Set January's closing NAV, then look at the year
//! pnl-journal nav set 2025 1 251250.50
//! pnl-journal ytd --year 2025
//!
//! # Bulk load from a spreadsheet export
//! pnl-journal import entries trades.csv --dry-run
//! ```

pub mod render;

use anyhow::{bail, Context};
use chrono::{Datelike, Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};

use crate::calendar::{covered_years, holidays_for_year, is_trading_day, trading_holiday};
use crate::commands;
use crate::db::Database;
use crate::error::JournalError;
use crate::models::validation::{parse_amount, parse_date};
use crate::models::{
    CreateEntryInput, EntryFilters, NavInput, TradingEntry, UpdateEntryInput, UpdateSettingsInput,
};

#[derive(Parser)]
#[command(name = "pnl-journal")]
#[command(about = "Daily P&L journal with monthly NAV marks and year-to-date rollups", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Journal database file
    #[arg(long, global = true, env = "PNL_JOURNAL_DB")]
    pub db: Option<PathBuf>,

    /// Debug logging (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log realized and paper P&L for a day
    Add {
        /// Trading date (YYYY-MM-DD)
        date: String,

        /// Realized P&L (e.g. 1250.50, -420, "$1,250")
        #[arg(short, long, allow_hyphen_values = true)]
        realized: String,

        /// Paper (unrealized) P&L
        #[arg(short, long, allow_hyphen_values = true, default_value = "0")]
        paper: String,

        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Change an entry, addressed by id or date
    Edit {
        /// Entry id or date (YYYY-MM-DD)
        target: String,

        /// Move the entry to another date
        #[arg(long)]
        date: Option<String>,

        #[arg(short, long, allow_hyphen_values = true)]
        realized: Option<String>,

        #[arg(short, long, allow_hyphen_values = true)]
        paper: Option<String>,

        /// New notes; pass "" to clear
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Delete an entry, addressed by id or date
    Delete {
        /// Entry id or date (YYYY-MM-DD)
        target: String,
    },

    /// Show one entry, addressed by id or date
    Show {
        /// Entry id or date (YYYY-MM-DD)
        target: String,
    },

    /// List entries
    List {
        #[arg(short, long)]
        year: Option<i32>,

        /// Needs --year
        #[arg(short, long)]
        month: Option<u32>,

        /// First date, inclusive (YYYY-MM-DD)
        #[arg(short = 'f', long)]
        from: Option<String>,

        /// Last date, inclusive (YYYY-MM-DD)
        #[arg(short, long)]
        to: Option<String>,
    },

    /// End-of-month NAV marks
    Nav {
        #[command(subcommand)]
        command: NavCommand,
    },

    /// Monthly P&L and NAV for every month on record
    Monthly,

    /// Year-to-date totals and current NAV
    Ytd {
        /// Defaults to the current year
        #[arg(short, long)]
        year: Option<i32>,
    },

    /// Month calendar with trading days and logged P&L
    Calendar {
        /// Defaults to the current year
        #[arg(short, long)]
        year: Option<i32>,

        /// Defaults to the current month
        #[arg(short, long)]
        month: Option<u32>,
    },

    /// Is the market open on this date?
    TradingDay {
        /// Date (YYYY-MM-DD)
        date: String,
    },

    /// Market holidays for a year
    Holidays {
        /// Defaults to the current year
        #[arg(short, long)]
        year: Option<i32>,
    },

    /// Bulk import from CSV
    Import {
        kind: CsvKind,

        /// CSV file path
        file: PathBuf,

        /// Show what would change without writing
        #[arg(long, default_value = "false")]
        dry_run: bool,
    },

    /// Print a sample CSV for `import`
    Template { kind: CsvKind },

    /// Write a full JSON backup
    Export {
        /// Output file path
        file: PathBuf,
    },

    /// Restore a JSON backup written by `export`
    Restore {
        /// Backup file path
        file: PathBuf,
    },

    /// Journal settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
}

#[derive(Subcommand)]
pub enum NavCommand {
    /// Set (or overwrite) the NAV for a month
    Set {
        year: i32,
        month: u32,
        /// NAV value, greater than 0
        #[arg(allow_hyphen_values = true)]
        value: String,
    },

    /// List all NAV marks
    List,

    /// Remove the NAV mark for a month
    Delete { year: i32, month: u32 },
}

#[derive(Subcommand)]
pub enum SettingsCommand {
    Show,

    Set {
        /// Three-letter currency code
        #[arg(long)]
        currency: Option<String>,

        /// NAV shown before any month has a mark
        #[arg(long)]
        default_nav: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CsvKind {
    Entries,
    Nav,
}

/// Resolve an entry by date when `target` parses as one, otherwise by id.
fn resolve_entry(db: &Database, target: &str) -> anyhow::Result<TradingEntry> {
    if let Ok(date) = parse_date(target) {
        return commands::get_entry_by_date(db, date)?
            .with_context(|| format!("No entry for {}", date));
    }
    Ok(commands::get_entry(db, target)?)
}

fn parse_optional_date(raw: Option<&str>) -> anyhow::Result<Option<NaiveDate>> {
    Ok(raw.map(parse_date).transpose()?)
}

fn read_file(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

pub fn execute(cli: Cli, db: &Database) -> anyhow::Result<()> {
    let json = cli.json;
    let currency = commands::get_settings(db)?.currency;
    let today = Local::now().date_naive();

    match cli.command {
        Commands::Add {
            date,
            realized,
            paper,
            notes,
        } => {
            let input = CreateEntryInput {
                date: parse_date(&date)?,
                realized_pnl: parse_amount("realized_pnl", &realized)?,
                paper_pnl: parse_amount("paper_pnl", &paper)?,
                notes,
            };

            if !is_trading_day(input.date) {
                log::warn!("{} is not a trading day", input.date);
            }

            match commands::create_entry(db, input) {
                Ok(entry) => {
                    if json {
                        render::print_json(&entry)?;
                    } else {
                        println!("Logged {}\n", entry.date);
                        println!("{}", render::entry_detail(&entry, &currency));
                    }
                }
                Err(JournalError::DuplicateDate { date, existing_id }) => {
                    // Open the existing entry instead of creating a second one
                    let existing = commands::get_entry(db, &existing_id)?;
                    if json {
                        render::print_json(&existing)?;
                    } else {
                        println!("An entry for {} already exists. Use `edit {}` to change it.\n", date, date);
                        println!("{}", render::entry_detail(&existing, &currency));
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }

        Commands::Edit {
            target,
            date,
            realized,
            paper,
            notes,
        } => {
            let entry = resolve_entry(db, &target)?;
            let update = UpdateEntryInput {
                date: parse_optional_date(date.as_deref())?,
                realized_pnl: realized
                    .map(|raw| parse_amount("realized_pnl", &raw))
                    .transpose()?,
                paper_pnl: paper.map(|raw| parse_amount("paper_pnl", &raw)).transpose()?,
                notes,
            };

            let updated = commands::update_entry(db, &entry.id, update)?;
            if json {
                render::print_json(&updated)?;
            } else {
                println!("{}", render::entry_detail(&updated, &currency));
            }
        }

        Commands::Delete { target } => {
            let entry = resolve_entry(db, &target)?;
            commands::delete_entry(db, &entry.id)?;
            println!("Deleted entry for {}", entry.date);
        }

        Commands::Show { target } => {
            let entry = resolve_entry(db, &target)?;
            if json {
                render::print_json(&entry)?;
            } else {
                println!("{}", render::entry_detail(&entry, &currency));
            }
        }

        Commands::List {
            year,
            month,
            from,
            to,
        } => {
            let filters = EntryFilters {
                from: parse_optional_date(from.as_deref())?,
                to: parse_optional_date(to.as_deref())?,
                year,
                month,
            };
            let entries = commands::get_entries(db, &filters)?;
            if json {
                render::print_json(&entries)?;
            } else {
                println!("{}", render::entries_table(&entries, &currency));
            }
        }

        Commands::Nav { command } => match command {
            NavCommand::Set { year, month, value } => {
                let nav_value = parse_amount("nav_value", &value)?;
                let nav = commands::upsert_monthly_nav(db, NavInput::new(year, month, nav_value))?;
                if json {
                    render::print_json(&nav)?;
                } else {
                    println!(
                        "NAV for {}-{:02} set to {}",
                        nav.year,
                        nav.month,
                        render::format_money(nav.nav_value, &currency)
                    );
                }
            }
            NavCommand::List => {
                let navs = commands::get_monthly_nav(db)?;
                if json {
                    render::print_json(&navs)?;
                } else {
                    println!("{}", render::nav_table(&navs, &currency));
                }
            }
            NavCommand::Delete { year, month } => {
                commands::delete_nav(db, year, month)?;
                println!("Deleted NAV for {}-{:02}", year, month);
            }
        },

        Commands::Monthly => {
            let rows = commands::get_monthly_summaries(db)?;
            if json {
                render::print_json(&rows)?;
            } else {
                println!("{}", render::monthly_table(&rows, &currency));
            }
        }

        Commands::Ytd { year } => {
            let ytd = commands::get_ytd_summary(db, year.unwrap_or(today.year()))?;
            if json {
                render::print_json(&ytd)?;
            } else {
                println!("{}", render::ytd_report(&ytd, &currency));
            }
        }

        Commands::Calendar { year, month } => {
            let grid = commands::get_calendar_month(
                db,
                year.unwrap_or(today.year()),
                month.unwrap_or(today.month()),
            )?;
            if json {
                render::print_json(&grid)?;
            } else {
                println!("{}", render::calendar_view(&grid, &currency));
            }
        }

        Commands::TradingDay { date } => {
            let date = parse_date(&date)?;
            let open = is_trading_day(date);
            if json {
                render::print_json(&serde_json::json!({
                    "date": date,
                    "trading_day": open,
                    "holiday": trading_holiday(date),
                }))?;
            } else if open {
                println!("{} ({}) is a trading day", date, date.format("%A"));
            } else if let Some(name) = trading_holiday(date) {
                println!("{} is a market holiday: {}", date, name);
            } else {
                println!("{} ({}) is a weekend", date, date.format("%A"));
            }
        }

        Commands::Holidays { year } => {
            let year = year.unwrap_or(today.year());
            let holidays = holidays_for_year(year);
            if json {
                render::print_json(&holidays)?;
            } else {
                println!("{}", render::holidays_table(year, &holidays, &covered_years()));
            }
        }

        Commands::Import {
            kind,
            file,
            dry_run,
        } => {
            let content = read_file(&file)?;
            match kind {
                CsvKind::Entries => {
                    let plan = commands::preview_entry_import(db, &content)?;
                    if json {
                        render::print_json(&plan)?;
                    } else {
                        print!("{}", render::entry_import_plan(&plan, &currency));
                    }
                    if !dry_run {
                        let result = commands::import_entry_csv(db, &content)?;
                        println!("Imported {} new, {} updated", result.inserted, result.updated);
                    }
                }
                CsvKind::Nav => {
                    let plan = commands::preview_nav_import(db, &content)?;
                    if json {
                        render::print_json(&plan)?;
                    } else {
                        print!("{}", render::nav_import_plan(&plan, &currency));
                    }
                    if !dry_run {
                        let result = commands::import_nav_csv(db, &content)?;
                        println!("Imported {} new, {} updated", result.inserted, result.updated);
                    }
                }
            }
        }

        Commands::Template { kind } => match kind {
            CsvKind::Entries => print!("{}", commands::entry_template()),
            CsvKind::Nav => print!("{}", commands::nav_template()),
        },

        Commands::Export { file } => {
            let backup = commands::export_all_data(db)?;
            fs::write(&file, backup).with_context(|| format!("Failed to write {}", file.display()))?;
            println!("Backup written to {}", file.display());
        }

        Commands::Restore { file } => {
            let content = read_file(&file)?;
            let result = commands::import_all_data(db, &content)
                .with_context(|| format!("Failed to restore {}", file.display()))?;
            println!(
                "Restored {} entries and {} NAV marks",
                result.entries, result.navs
            );
        }

        Commands::Settings { command } => match command {
            SettingsCommand::Show => {
                let settings = commands::get_settings(db)?;
                if json {
                    render::print_json(&settings)?;
                } else {
                    println!("{}", render::settings_view(&settings));
                }
            }
            SettingsCommand::Set {
                currency,
                default_nav,
            } => {
                if currency.is_none() && default_nav.is_none() {
                    bail!("Nothing to update: pass --currency and/or --default-nav");
                }
                let update = UpdateSettingsInput {
                    currency,
                    default_nav: default_nav
                        .map(|raw| parse_amount("default_nav", &raw))
                        .transpose()?,
                };
                let settings = commands::update_settings(db, update)?;
                println!("{}", render::settings_view(&settings));
            }
        },
    }

    Ok(())
}
