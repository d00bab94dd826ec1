//! Application state for one dashboard session.
//!
//! A [`Dashboard`] owns the location store, the unit preference and the
//! last weather report. Fetches are issued as [`FetchTicket`]s and their
//! results handed back through [`Dashboard::apply`], so a response that
//! arrives after the user moved to another location is dropped instead of
//! overwriting the newer view.

use crate::{
    model::{Coordinate, FavoriteLocation, TemperatureUnit, WeatherReport, WeatherRequest},
    present::{self, DashboardView},
    provider::{FetchError, WeatherProvider},
    store::{KeyValueStore, LocationStore},
};

/// What caused a refresh. Only used for logging; every trigger issues the
/// same request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    LocationChanged,
    Interval,
    Foreground,
    Manual,
}

/// Tag carried by an in-flight fetch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FetchTicket {
    pub coordinate: Coordinate,
    generation: u64,
}

impl FetchTicket {
    pub fn request(&self) -> WeatherRequest {
        WeatherRequest::now(self.coordinate)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Updated,
    Cleared,
    /// The ticket belonged to a location that is no longer active.
    Stale,
}

#[derive(Debug)]
pub struct Dashboard<S: KeyValueStore> {
    store: LocationStore<S>,
    unit: TemperatureUnit,
    report: Option<WeatherReport>,
    generation: u64,
    in_flight: Option<FetchTicket>,
}

impl<S: KeyValueStore> Dashboard<S> {
    pub fn new(store: LocationStore<S>, unit: TemperatureUnit) -> Self {
        Self {
            store,
            unit,
            report: None,
            generation: 0,
            in_flight: None,
        }
    }

    pub fn active_location(&self) -> Option<Coordinate> {
        self.store.active_location()
    }

    pub fn favorites(&self) -> &[FavoriteLocation] {
        self.store.favorites()
    }

    pub fn unit(&self) -> TemperatureUnit {
        self.unit
    }

    pub fn report(&self) -> Option<&WeatherReport> {
        self.report.as_ref()
    }

    pub fn set_unit(&mut self, unit: TemperatureUnit) {
        self.unit = unit;
    }

    /// Make `coordinate` active. Returns a ticket for the immediate fetch when
    /// the location actually changed.
    pub fn set_location(&mut self, coordinate: Coordinate) -> Option<FetchTicket> {
        if !self.store.set_active_location(coordinate) {
            return None;
        }
        self.location_changed();
        self.request_refresh(Trigger::LocationChanged)
    }

    /// Drop the active location together with any weather shown for it.
    pub fn clear_location(&mut self) {
        self.store.clear_active_location();
        self.location_changed();
    }

    pub fn select_favorite(&mut self, favorite: &FavoriteLocation) -> Option<FetchTicket> {
        self.set_location(favorite.coordinate())
    }

    pub fn add_favorite(&mut self, coordinate: Coordinate, name: Option<String>) -> bool {
        self.store.add_favorite(coordinate, name)
    }

    pub fn remove_favorite(&mut self, coordinate: Coordinate) -> usize {
        self.store.remove_favorite(coordinate)
    }

    pub fn find_favorite(&self, name: &str) -> Option<FavoriteLocation> {
        self.store.find_favorite(name).cloned()
    }

    /// Ticket for a refetch of the active location, or `None` when there is
    /// no active location or the same request is already in flight.
    pub fn request_refresh(&mut self, trigger: Trigger) -> Option<FetchTicket> {
        let Some(coordinate) = self.store.active_location() else {
            tracing::trace!("Refresh ({:?}) skipped: no active location", trigger);
            return None;
        };

        if self.in_flight.is_some_and(|t| t.generation == self.generation) {
            tracing::debug!("Refresh ({:?}) skipped: request already in flight", trigger);
            return None;
        }

        let ticket = FetchTicket {
            coordinate,
            generation: self.generation,
        };
        self.in_flight = Some(ticket);
        tracing::debug!("Refreshing weather for {} ({:?})", coordinate, trigger);
        Some(ticket)
    }

    /// Record the result of a fetch issued with `ticket`.
    ///
    /// A failure clears the report; the previous data is never kept around.
    pub fn apply(
        &mut self,
        ticket: FetchTicket,
        result: Result<WeatherReport, FetchError>,
    ) -> ApplyOutcome {
        if self.in_flight == Some(ticket) {
            self.in_flight = None;
        }

        let current = ticket.generation == self.generation
            && self.store.active_location() == Some(ticket.coordinate);
        if !current {
            tracing::debug!("Discarding stale forecast for {}", ticket.coordinate);
            return ApplyOutcome::Stale;
        }

        match result {
            Ok(report) => {
                self.report = Some(report);
                ApplyOutcome::Updated
            }
            Err(e) => {
                tracing::warn!("Error fetching weather for {}: {}", ticket.coordinate, e);
                self.report = None;
                ApplyOutcome::Cleared
            }
        }
    }

    /// Issue and await a fetch in one step.
    pub async fn refresh(
        &mut self,
        provider: &dyn WeatherProvider,
        trigger: Trigger,
    ) -> Option<ApplyOutcome> {
        let ticket = self.request_refresh(trigger)?;
        let result = provider.get_weather(&ticket.request()).await;
        Some(self.apply(ticket, result))
    }

    pub fn view(&self) -> DashboardView<'_> {
        DashboardView {
            report: self.report.as_ref(),
            location: self.store.active_location(),
            unit: self.unit,
            favorites: self.store.favorites(),
        }
    }

    pub fn render(&self) -> String {
        present::render_dashboard(&self.view())
    }

    fn location_changed(&mut self) {
        self.generation += 1;
        self.report = None;
    }
}
