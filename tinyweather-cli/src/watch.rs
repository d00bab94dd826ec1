//! `tinyweather watch`: a live dashboard driven by one event loop.
//!
//! Fetches run on spawned tasks and report back over a channel; all state
//! changes happen here, one event at a time.

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tinyweather_core::{
    ApplyOutcome, FetchError, FetchTicket, Trigger, WeatherProvider, WeatherReport,
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
    time::{self, Instant, MissedTickBehavior},
};

use crate::{
    cli::{CoordinateArgs, FavCommand},
    session::Session,
};

type FetchResult = (FetchTicket, Result<WeatherReport, FetchError>);

/// Commands accepted at the watch prompt.
#[derive(Debug, Parser)]
#[command(no_binary_name = true, disable_version_flag = true)]
struct PromptLine {
    #[command(subcommand)]
    command: PromptCommand,
}

#[derive(Debug, Subcommand)]
enum PromptCommand {
    /// Set the active location.
    Set(CoordinateArgs),
    /// Forget the active location.
    Clear,
    /// Manage favorites (select takes a name or list number).
    #[command(subcommand)]
    Fav(FavCommand),
    /// Switch and persist the display unit.
    Unit { unit: String },
    /// Refetch now.
    Refresh,
    /// Leave the dashboard.
    #[command(alias = "exit")]
    Quit,
}

#[derive(Debug)]
enum Step {
    Continue,
    Fetch {
        ticket: FetchTicket,
        /// Location changes restart the interval; manual refreshes keep it.
        restart_schedule: bool,
    },
    Quit,
}

impl Step {
    fn fetch(ticket: Option<FetchTicket>, restart_schedule: bool) -> Self {
        match ticket {
            Some(ticket) => Step::Fetch {
                ticket,
                restart_schedule,
            },
            None => Step::Continue,
        }
    }
}

pub async fn run(mut session: Session, provider: Arc<dyn WeatherProvider>) -> Result<()> {
    let period = session.config().refresh_interval();
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let (tx, mut rx) = mpsc::unbounded_channel::<FetchResult>();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut foreground = Foreground::new()?;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    // Without stdin the prompt goes away but the schedule keeps running.
    let mut stdin_open = true;

    if let Some(ticket) = session.dashboard_mut().request_refresh(Trigger::LocationChanged) {
        spawn_fetch(&provider, &tx, ticket);
    }
    redraw(&session);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Some(ticket) = session.dashboard_mut().request_refresh(Trigger::Interval) {
                    spawn_fetch(&provider, &tx, ticket);
                }
            }
            _ = foreground.resumed() => {
                if let Some(ticket) = session.dashboard_mut().request_refresh(Trigger::Foreground) {
                    spawn_fetch(&provider, &tx, ticket);
                }
            }
            Some((ticket, result)) = rx.recv() => {
                match session.dashboard_mut().apply(ticket, result) {
                    ApplyOutcome::Stale => {}
                    ApplyOutcome::Updated | ApplyOutcome::Cleared => redraw(&session),
                }
            }
            line = lines.next_line(), if stdin_open => {
                let line = match read_outcome(line) {
                    Input::Line(line) => line,
                    Input::Skip => continue,
                    Input::Closed => {
                        stdin_open = false;
                        continue;
                    }
                };
                match handle_line(&mut session, &line) {
                    Ok(Step::Quit) => break,
                    Ok(Step::Fetch { ticket, restart_schedule }) => {
                        if restart_schedule {
                            interval.reset();
                        }
                        spawn_fetch(&provider, &tx, ticket);
                    }
                    Ok(Step::Continue) => {}
                    Err(e) => eprintln!("{e}"),
                }
            }
            _ = &mut ctrl_c => break,
        }
    }

    tracing::debug!("Leaving watch mode");
    Ok(())
}

enum Input {
    Line(String),
    Skip,
    Closed,
}

/// Only EOF or a broken stdin closes the prompt; a garbled line is skipped.
fn read_outcome(line: std::io::Result<Option<String>>) -> Input {
    match line {
        Ok(Some(line)) => Input::Line(line),
        Ok(None) => {
            tracing::debug!("stdin closed; prompt disabled");
            Input::Closed
        }
        Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
            tracing::warn!("Ignoring unreadable input line: {}", e);
            Input::Skip
        }
        Err(e) => {
            tracing::warn!("Failed to read stdin, prompt disabled: {}", e);
            Input::Closed
        }
    }
}

fn handle_line(session: &mut Session, line: &str) -> Result<Step> {
    let words: Vec<&str> = line.split_whitespace().collect();
    if words.is_empty() {
        return Ok(Step::Continue);
    }

    let parsed = match PromptLine::try_parse_from(words) {
        Ok(parsed) => parsed,
        Err(e) => {
            // clap renders help and usage errors itself.
            eprintln!("{e}");
            return Ok(Step::Continue);
        }
    };

    let step = match parsed.command {
        PromptCommand::Set(c) => Step::fetch(session.set_location(&c.lat, &c.lon)?, true),
        PromptCommand::Clear => {
            session.clear_location();
            redraw(session);
            Step::Continue
        }
        PromptCommand::Fav(cmd) => {
            let renames = matches!(cmd, FavCommand::Add { .. } | FavCommand::Remove(_));
            match session.favorite(cmd, false)? {
                Some(ticket) => Step::Fetch {
                    ticket,
                    restart_schedule: true,
                },
                None => {
                    // The active location's display name may have changed.
                    if renames {
                        redraw(session);
                    }
                    Step::Continue
                }
            }
        }
        PromptCommand::Unit { unit } => {
            session.save_unit(&unit)?;
            redraw(session);
            Step::Continue
        }
        PromptCommand::Refresh => {
            Step::fetch(session.dashboard_mut().request_refresh(Trigger::Manual), false)
        }
        PromptCommand::Quit => Step::Quit,
    };

    Ok(step)
}

fn spawn_fetch(
    provider: &Arc<dyn WeatherProvider>,
    tx: &mpsc::UnboundedSender<FetchResult>,
    ticket: FetchTicket,
) {
    let provider = Arc::clone(provider);
    let tx = tx.clone();

    tokio::spawn(async move {
        let result = provider.get_weather(&ticket.request()).await;
        // The receiver only goes away when the loop has exited.
        let _ = tx.send((ticket, result));
    });
}

fn redraw(session: &Session) {
    let now = chrono::Local::now().format("%H:%M:%S");
    println!();
    println!("{}", session.dashboard().render().trim_end());
    println!();
    println!("[{now}] set <lat> <lon> | fav add/remove/list/select | unit <c|f> | refresh | quit");
}

/// Resolves when the process is resumed from the background (SIGCONT).
struct Foreground {
    #[cfg(unix)]
    signal: tokio::signal::unix::Signal,
}

impl Foreground {
    #[cfg(unix)]
    fn new() -> Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            signal: signal(SignalKind::from_raw(libc::SIGCONT))?,
        })
    }

    #[cfg(not(unix))]
    fn new() -> Result<Self> {
        Ok(Self {})
    }

    #[cfg(unix)]
    async fn resumed(&mut self) {
        if self.signal.recv().await.is_none() {
            std::future::pending::<()>().await
        }
        tracing::debug!("Resumed from background");
    }

    #[cfg(not(unix))]
    async fn resumed(&mut self) {
        std::future::pending::<()>().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{io, path::Path};
    use chrono::NaiveDate;
    use tinyweather_core::{Coordinate, DailyForecast, TodayWeather};

    fn session(dir: &Path) -> Session {
        let config = dir.join("config.toml");
        let data = dir.join("data");
        Session::open(Some(config.as_path()), Some(data.as_path()), None).unwrap()
    }

    fn finish(session: &mut Session, step: Step) {
        if let Step::Fetch { ticket, .. } = step {
            session
                .dashboard_mut()
                .apply(ticket, Err(FetchError::Shape("offline".into())));
        }
    }

    #[test]
    fn set_restarts_schedule_and_repeat_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session(dir.path());

        let step = handle_line(&mut s, "set 51.5 -0.12").unwrap();
        assert!(matches!(step, Step::Fetch { restart_schedule: true, .. }));
        assert_eq!(s.dashboard().active_location(), Some(Coordinate::new(51.5, -0.12)));
        finish(&mut s, step);

        assert!(matches!(handle_line(&mut s, "set 51.5 -0.12").unwrap(), Step::Continue));
    }

    #[test]
    fn refresh_keeps_schedule() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session(dir.path());

        assert!(matches!(handle_line(&mut s, "refresh").unwrap(), Step::Continue));

        let step = handle_line(&mut s, "set 10 20").unwrap();
        // Still in flight.
        assert!(matches!(handle_line(&mut s, "refresh").unwrap(), Step::Continue));
        finish(&mut s, step);

        assert!(matches!(
            handle_line(&mut s, "refresh").unwrap(),
            Step::Fetch { restart_schedule: false, .. }
        ));
    }

    #[test]
    fn fav_select_restarts_schedule_and_add_does_not_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session(dir.path());

        let step = handle_line(&mut s, "fav add 48.8566 2.3522 --name Paris").unwrap();
        assert!(matches!(step, Step::Continue));

        let step = handle_line(&mut s, "fav select paris").unwrap();
        assert!(matches!(step, Step::Fetch { restart_schedule: true, .. }));
        assert_eq!(
            s.dashboard().active_location(),
            Some(Coordinate::new(48.8566, 2.3522))
        );
    }

    #[test]
    fn quit_blank_and_unknown_lines() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session(dir.path());

        assert!(matches!(handle_line(&mut s, "quit").unwrap(), Step::Quit));
        assert!(matches!(handle_line(&mut s, "exit").unwrap(), Step::Quit));
        assert!(matches!(handle_line(&mut s, "   ").unwrap(), Step::Continue));
        assert!(matches!(handle_line(&mut s, "bogus").unwrap(), Step::Continue));
    }

    fn report() -> WeatherReport {
        let day = NaiveDate::from_ymd_opt(2025, 3, 18).unwrap();
        let at = |h| day.and_hms_opt(h, 0, 0).unwrap();
        WeatherReport {
            today: TodayWeather {
                temperature: 11.0,
                apparent_temperature: 9.0,
                dewpoint: 4.0,
                precipitation: 0.0,
                rain: 0.0,
                snowfall: 0.0,
                precipitation_probability: 5.0,
                wind_speed: 12.0,
                wind_direction: 90.0,
                cloud_cover: 20.0,
                visibility: 20_000.0,
                humidity: 60.0,
                weather_code: 0,
                time: at(12),
            },
            daily: vec![DailyForecast {
                date: day,
                temp_max: 13.0,
                temp_min: 3.0,
                precipitation_sum: 0.0,
                sunrise: at(6),
                sunset: at(18),
                wind_speed_max: 25.0,
                weather_code: 0,
            }],
            timezone: None,
        }
    }

    #[test]
    fn naming_the_active_location_shows_up_without_refetch() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session(dir.path());

        let Step::Fetch { ticket, .. } = handle_line(&mut s, "set 10 20").unwrap() else {
            panic!("set should fetch");
        };
        s.dashboard_mut().apply(ticket, Ok(report()));
        assert!(s.dashboard().render().starts_with("Today at (10, 20)"));

        let step = handle_line(&mut s, "fav add 10 20 --name Home").unwrap();
        assert!(matches!(step, Step::Continue));
        assert!(s.dashboard().render().starts_with("Today at Home"));
    }

    #[test]
    fn stdin_eof_and_errors() {
        assert!(matches!(read_outcome(Ok(Some("refresh".into()))), Input::Line(l) if l == "refresh"));
        assert!(matches!(read_outcome(Ok(None)), Input::Closed));
        assert!(matches!(
            read_outcome(Err(io::Error::new(io::ErrorKind::InvalidData, "bad utf-8"))),
            Input::Skip
        ));
        assert!(matches!(
            read_outcome(Err(io::Error::other("broken pipe"))),
            Input::Closed
        ));
    }

    #[test]
    fn invalid_coordinate_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session(dir.path());

        assert!(handle_line(&mut s, "set north 1").is_err());
        assert_eq!(s.dashboard().active_location(), None);
    }
}
