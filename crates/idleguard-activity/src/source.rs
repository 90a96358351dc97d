//! The activity source: route-gated forwarding of raw interactions.

use tracing::{debug, trace};

use crate::{ActivitySink, InteractionKind, RouteClassifier};

/// What a route change did to the subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteChange {
    /// Moved from an exempt (or unknown) route onto a tracked one.
    StartedTracking,
    /// Moved from a tracked route onto an exempt one.
    StoppedTracking,
    /// Tracking state is the same as before.
    Unchanged,
}

/// Forwards tracked interactions to the attached sink.
///
/// The source starts with no known route and therefore not tracking; the
/// host reports the current route through [`set_route`](Self::set_route)
/// before interactions are forwarded. Emission is not debounced: every
/// tracked interaction on a tracked route reaches the sink.
pub struct ActivitySource<C, S> {
    classifier: C,
    tracked: Vec<InteractionKind>,
    current_route: Option<String>,
    tracking: bool,
    sink: Option<S>,
    emitted: u64,
}

impl<C: RouteClassifier, S: ActivitySink> ActivitySource<C, S> {
    /// Creates a source tracking [`InteractionKind::DEFAULT_TRACKED`].
    pub fn new(classifier: C) -> Self {
        Self::with_tracked(classifier, InteractionKind::DEFAULT_TRACKED)
    }

    /// Creates a source tracking a custom set of interaction classes.
    pub fn with_tracked(
        classifier: C,
        tracked: impl IntoIterator<Item = InteractionKind>,
    ) -> Self {
        Self {
            classifier,
            tracked: tracked.into_iter().collect(),
            current_route: None,
            tracking: false,
            sink: None,
            emitted: 0,
        }
    }

    /// Records a route change and subscribes/unsubscribes accordingly.
    pub fn set_route(&mut self, path: &str) -> RouteChange {
        let was_tracking = self.tracking;
        self.tracking = !self.classifier.is_exempt(path);
        self.current_route = Some(path.to_string());

        match (was_tracking, self.tracking) {
            (false, true) => {
                debug!(route = path, "entered tracked route, listening for activity");
                RouteChange::StartedTracking
            }
            (true, false) => {
                debug!(route = path, "entered exempt route, activity listeners removed");
                RouteChange::StoppedTracking
            }
            _ => RouteChange::Unchanged,
        }
    }

    /// Connects the sink that receives `ActivityDetected`, replacing any
    /// previous one.
    pub fn attach(&mut self, sink: S) {
        self.sink = Some(sink);
    }

    /// Disconnects the sink. Interactions are dropped until the next
    /// [`attach`](Self::attach).
    pub fn detach(&mut self) -> Option<S> {
        self.sink.take()
    }

    /// Reports one raw interaction. Returns `true` if it was forwarded.
    pub fn record(&mut self, kind: InteractionKind) -> bool {
        if !self.tracking || !self.tracked.contains(&kind) {
            return false;
        }
        let Some(sink) = &self.sink else {
            return false;
        };
        sink.activity_detected(kind);
        self.emitted += 1;
        trace!(%kind, "activity detected");
        true
    }

    /// Whether interactions are currently being forwarded.
    pub fn is_tracking(&self) -> bool {
        self.tracking
    }

    /// Whether a sink is attached.
    pub fn has_sink(&self) -> bool {
        self.sink.is_some()
    }

    /// The most recently reported route, if any.
    pub fn current_route(&self) -> Option<&str> {
        self.current_route.as_deref()
    }

    /// Total number of signals forwarded since creation.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// The route classifier in use.
    pub fn classifier(&self) -> &C {
        &self.classifier
    }
}
