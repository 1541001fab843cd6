//! What the companion device asked the map to show.
//!
//! A [`SessionItem`] is either nothing, a single destination, or a route. The
//! route model is geometry plus guidance: ordered polyline segments tagged
//! with a traffic load, optional walking legs before and after the drive, and
//! the list of maneuvers the user can step through.

use serde::{Deserialize, Serialize};

use crate::coord::GeoCoordinate;

/// Traffic load of a route segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrafficLoad {
    Slow,
    Normal,
    /// Segments without traffic information are drawn as free-flowing.
    #[default]
    Fast,
    Ignore,
    NoTraffic,
    Inactive,
}

impl TrafficLoad {
    /// RGB colour the segment is drawn with.
    pub fn rgb(&self) -> [u8; 3] {
        match self {
            TrafficLoad::Slow => [242, 90, 0],
            TrafficLoad::Normal => [255, 192, 0],
            TrafficLoad::Fast => [69, 183, 0],
            TrafficLoad::Ignore => [129, 2, 13],
            TrafficLoad::NoTraffic => [73, 107, 195],
            TrafficLoad::Inactive => [128, 128, 128],
        }
    }
}

/// A polyline with one traffic load.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PathSegment {
    #[serde(default)]
    pub traffic: TrafficLoad,
    pub points: Vec<GeoCoordinate>,
}

impl PathSegment {
    pub fn new(traffic: TrafficLoad, points: Vec<GeoCoordinate>) -> Self {
        Self { traffic, points }
    }
}

/// One turn-by-turn instruction along a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Maneuver {
    /// Where the maneuver begins; selecting it centres the map here.
    pub start: GeoCoordinate,

    /// Name of the road taken after the maneuver.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outgoing: Option<String>,

    /// Human readable instruction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Maneuver {
    pub fn new(start: GeoCoordinate) -> Self {
        Self {
            start,
            outgoing: None,
            comment: None,
        }
    }

    pub fn with_comment(mut self, outgoing: impl Into<String>, comment: impl Into<String>) -> Self {
        self.outgoing = Some(outgoing.into());
        self.comment = Some(comment.into());
        self
    }
}

/// A driving route with optional walking legs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Route {
    pub segments: Vec<PathSegment>,

    /// Walk from the user to where the drive begins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_in: Option<Vec<GeoCoordinate>>,

    /// Walk from where the drive ends to the destination.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_out: Option<Vec<GeoCoordinate>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub maneuvers: Vec<Maneuver>,
}

impl Route {
    pub fn new(segments: Vec<PathSegment>) -> Self {
        Self {
            segments,
            lead_in: None,
            lead_out: None,
            maneuvers: Vec::new(),
        }
    }

    pub fn with_lead_in(mut self, points: Vec<GeoCoordinate>) -> Self {
        self.lead_in = Some(points);
        self
    }

    pub fn with_lead_out(mut self, points: Vec<GeoCoordinate>) -> Self {
        self.lead_out = Some(points);
        self
    }

    pub fn with_maneuvers(mut self, maneuvers: Vec<Maneuver>) -> Self {
        self.maneuvers = maneuvers;
        self
    }

    pub fn maneuver(&self, index: usize) -> Option<&Maneuver> {
        self.maneuvers.get(index)
    }

    /// Where the route begins: the first walking point if there is a lead-in,
    /// otherwise the first point of the first non-empty segment.
    pub fn start_point(&self) -> Option<GeoCoordinate> {
        if let Some(point) = self.lead_in.as_ref().and_then(|p| p.first()) {
            return Some(*point);
        }
        self.segments
            .iter()
            .find(|s| !s.points.is_empty())
            .and_then(|s| s.points.first().copied())
    }

    /// Where the route ends, mirroring [`Route::start_point`].
    pub fn end_point(&self) -> Option<GeoCoordinate> {
        if let Some(point) = self.lead_out.as_ref().and_then(|p| p.last()) {
            return Some(*point);
        }
        self.segments
            .iter()
            .rev()
            .find(|s| !s.points.is_empty())
            .and_then(|s| s.points.last().copied())
    }

    /// Every driving point in order. Walking legs are not part of the line.
    pub fn points(&self) -> impl Iterator<Item = &GeoCoordinate> {
        self.segments.iter().flat_map(|s| s.points.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.segments.iter().all(|s| s.points.is_empty())
    }
}

/// Item pushed by the companion device.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionItem {
    #[default]
    Empty,
    Coordinate(GeoCoordinate),
    Route(Route),
}

impl SessionItem {
    pub fn is_empty(&self) -> bool {
        matches!(self, SessionItem::Empty)
    }

    /// Short description for logs.
    pub fn describe(&self) -> &'static str {
        match self {
            SessionItem::Empty => "cleared",
            SessionItem::Coordinate(_) => "destination",
            SessionItem::Route(_) => "route",
        }
    }

    pub fn destination(&self) -> Option<GeoCoordinate> {
        match self {
            SessionItem::Coordinate(coord) => Some(*coord),
            _ => None,
        }
    }

    pub fn route(&self) -> Option<&Route> {
        match self {
            SessionItem::Route(route) => Some(route),
            _ => None,
        }
    }
}
