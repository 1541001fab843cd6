//! Main-context driver tying the view to the loader.
//!
//! The engine owns the [`MapView`] and issues tile requests for it. Requests
//! answered immediately (cache or bundle) are applied in place; the rest are
//! forwarded back over a channel and applied when the caller polls
//! [`MapEngine::next_event`] or [`MapEngine::drain_events`]. Applying always
//! happens on the caller's context, so the view is never shared.

use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::coord::{GeoCoordinate, ScreenPoint, Size, TileAddress, BUILDING_ZOOM, DISTRICT_ZOOM};
use crate::loader::{TileError, TileLoader, TileOutcome};
use crate::session::SessionItem;

use super::draw::DrawList;
use super::view::{MapView, ZoomTransition};

/// How the map relates to the user's position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FollowingMode {
    /// No known user position.
    #[default]
    Disabled,
    /// Position known, map moves freely.
    Center,
    /// Map recentres on every position update.
    Following,
}

/// Outcome of applying one asynchronous tile result.
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    TileLoaded(TileAddress),
    TileFailed {
        address: TileAddress,
        error: TileError,
    },
    /// The tile's slot was released before the result arrived.
    TileDiscarded(TileAddress),
}

struct TileResult {
    address: TileAddress,
    outcome: TileOutcome,
}

pub struct MapEngine {
    view: MapView,
    loader: TileLoader,
    results_tx: mpsc::UnboundedSender<TileResult>,
    results_rx: mpsc::UnboundedReceiver<TileResult>,
    pending: usize,
    tracking: bool,
    located: bool,
}

impl MapEngine {
    pub fn new(loader: TileLoader, viewport: Size) -> Self {
        Self::with_view(loader, MapView::new(viewport))
    }

    pub fn with_view(loader: TileLoader, view: MapView) -> Self {
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        Self {
            view,
            loader,
            results_tx,
            results_rx,
            pending: 0,
            tracking: false,
            located: false,
        }
    }

    pub fn view(&self) -> &MapView {
        &self.view
    }

    pub fn loader(&self) -> &TileLoader {
        &self.loader
    }

    /// Results forwarded but not yet applied.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Change the scale; on a zoom change, cancel loads of the released
    /// layers and request the new visible tiles.
    pub fn set_scale(&mut self, scale: f64) -> Option<ZoomTransition> {
        let transition = self.view.set_scale(scale)?;
        self.release(&transition.released);
        self.load_visible_tiles();
        Some(transition)
    }

    /// Centre on `coord` at `scale` and request the visible tiles.
    pub fn move_to(&mut self, coord: GeoCoordinate, scale: f64) -> Option<ZoomTransition> {
        let transition = self.view.move_to(coord, scale);
        if let Some(transition) = &transition {
            self.release(&transition.released);
        }
        self.load_visible_tiles();
        transition
    }

    /// Move the camera by user gesture. Stops following the user.
    pub fn pan_to(&mut self, camera: ScreenPoint) {
        self.tracking = false;
        self.view.pan_to(camera);
        self.load_visible_tiles();
    }

    pub fn set_session_item(&mut self, item: SessionItem) {
        self.view.set_session_item(item);
    }

    /// Record the user's position.
    ///
    /// The first fix centres the map at district zoom; later fixes recentre
    /// only while following. Returns true when the user drifted away from
    /// the last centred coordinate.
    pub fn set_current_location(&mut self, coord: GeoCoordinate) -> bool {
        let drifted = self.view.set_current_location(coord);

        if !self.located {
            self.located = true;
            self.move_to(coord, DISTRICT_ZOOM);
        } else if self.tracking {
            let scale = self.view.scale();
            self.move_to(coord, scale);
        }
        drifted
    }

    /// Centre on the user at building zoom and keep following. Returns false
    /// if no position is known yet.
    pub fn follow_user(&mut self) -> bool {
        let Some(location) = self.view.current_location() else {
            return false;
        };
        self.tracking = true;
        self.move_to(location, BUILDING_ZOOM);
        true
    }

    /// Select a route maneuver and centre on its start at building zoom.
    /// Stops following the user. Returns false if the current route has no
    /// maneuver at `index`.
    pub fn select_maneuver(&mut self, index: usize) -> bool {
        let Some(start) = self.view.select_maneuver(index) else {
            return false;
        };
        self.tracking = false;
        self.move_to(start, BUILDING_ZOOM);
        true
    }

    pub fn following_mode(&self) -> FollowingMode {
        match (self.view.current_location(), self.tracking) {
            (None, _) => FollowingMode::Disabled,
            (Some(_), true) => FollowingMode::Following,
            (Some(_), false) => FollowingMode::Center,
        }
    }

    /// Request every wanted tile of the current camera frame that is not
    /// already loaded or loading. Returns the number of requests issued.
    pub fn load_visible_tiles(&mut self) -> usize {
        let mut issued = 0;

        for request in self.view.plan_visible_tiles() {
            if !request.should_fetch() {
                continue;
            }
            let address = request.address();
            if !self.view.begin_load(address) {
                continue;
            }
            issued += 1;

            let mut ticket = self.loader.load(address, request.priority());
            match ticket.try_ready() {
                Some(outcome) => {
                    self.apply(address, outcome);
                }
                None => {
                    let tx = self.results_tx.clone();
                    self.pending += 1;
                    self.loader.runtime().spawn(async move {
                        let outcome = ticket.await;
                        let _ = tx.send(TileResult { address, outcome });
                    });
                }
            }
        }

        if issued > 0 {
            debug!(zoom = self.view.zoom(), issued, "Requested visible tiles");
        }
        issued
    }

    /// Wait for the next forwarded result and apply it. Returns `None` when
    /// nothing is pending.
    pub async fn next_event(&mut self) -> Option<MapEvent> {
        if self.pending == 0 {
            return None;
        }
        let result = self.results_rx.recv().await?;
        self.pending -= 1;
        Some(self.apply(result.address, result.outcome))
    }

    /// Apply every result that has already arrived.
    pub fn drain_events(&mut self) -> Vec<MapEvent> {
        let mut events = Vec::new();
        while let Ok(result) = self.results_rx.try_recv() {
            self.pending = self.pending.saturating_sub(1);
            events.push(self.apply(result.address, result.outcome));
        }
        events
    }

    pub fn draw_list(&self) -> DrawList {
        self.view.draw_list()
    }

    fn apply(&mut self, address: TileAddress, outcome: TileOutcome) -> MapEvent {
        match outcome {
            Ok(image) => {
                if self.view.finish_load(address, Some(image)) {
                    trace!(tile = %address, "Tile placed");
                    return MapEvent::TileLoaded(address);
                }
            }
            Err(error) => {
                if self.view.finish_load(address, None) {
                    return MapEvent::TileFailed { address, error };
                }
            }
        }

        trace!(tile = %address, "Dropped result for released tile");
        MapEvent::TileDiscarded(address)
    }

    fn release(&self, released: &[TileAddress]) {
        for address in released {
            self.loader.cancel(*address);
        }
    }
}
