//! One-bill-at-a-time browsing over a ranked list: filter tabs, bounded
//! navigation with a short transition lock, and swipe gestures.

use serde::{Deserialize, Serialize};

use crate::analysis::{AnalyzedBill, Recommendation};
use crate::clock::SharedClock;

/// Horizontal travel a drag must exceed to count as a swipe.
pub const SWIPE_THRESHOLD: f64 = 50.0;
pub const TRANSITION_MS: i64 = 300;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Filter {
    #[default]
    All,
    Support,
    Oppose,
    Engage,
}

impl Filter {
    pub fn admits(self, rec: Recommendation) -> bool {
        match self {
            Filter::All => true,
            Filter::Support => rec == Recommendation::Support,
            Filter::Oppose => rec == Recommendation::Oppose,
            Filter::Engage => rec == Recommendation::Engage,
        }
    }
}

/// Animation hint: `Left` when advancing, `Right` when going back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowsingState {
    pub filter: Filter,
    pub current_index: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub all: usize,
    pub support: usize,
    pub oppose: usize,
    pub engage: usize,
}

#[derive(Debug, Clone, Copy, Default)]
struct Touch {
    start_x: f64,
    end_x: Option<f64>,
}

pub struct BillDeck {
    items: Vec<AnalyzedBill>,
    state: BrowsingState,
    clock: SharedClock,
    direction: Option<Direction>,
    transition_until: i64,
    touch: Option<Touch>,
}

impl BillDeck {
    /// The initial filter and index are taken as given; the index is clamped
    /// into the filtered list.
    pub fn new(
        items: Vec<AnalyzedBill>,
        initial: BrowsingState,
        clock: SharedClock,
    ) -> Self {
        let mut deck = Self {
            items,
            state: initial,
            clock,
            direction: None,
            transition_until: i64::MIN,
            touch: None,
        };
        deck.clamp_index();
        deck
    }

    pub fn state(&self) -> BrowsingState {
        self.state
    }

    pub fn items(&self) -> &[AnalyzedBill] {
        &self.items
    }

    pub fn filtered(&self) -> Vec<&AnalyzedBill> {
        let f = self.state.filter;
        self.items
            .iter()
            .filter(|b| f.admits(b.recommendation()))
            .collect()
    }

    fn filtered_len(&self) -> usize {
        let f = self.state.filter;
        self.items
            .iter()
            .filter(|b| f.admits(b.recommendation()))
            .count()
    }

    pub fn current(&self) -> Option<&AnalyzedBill> {
        self.filtered().get(self.state.current_index).copied()
    }

    /// 1-based position and filtered length, `None` when nothing is shown.
    pub fn position(&self) -> Option<(usize, usize)> {
        let n = self.filtered_len();
        (n > 0).then_some((self.state.current_index + 1, n))
    }

    pub fn counts(&self) -> Counts {
        let mut c = Counts {
            all: self.items.len(),
            ..Default::default()
        };
        for item in &self.items {
            match item.recommendation() {
                Recommendation::Support => c.support += 1,
                Recommendation::Oppose => c.oppose += 1,
                Recommendation::Engage => c.engage += 1,
            }
        }
        c
    }

    /// Switching tabs resets to the first bill. Re-selecting the active tab
    /// changes nothing.
    pub fn set_filter(&mut self, filter: Filter) -> bool {
        if filter == self.state.filter {
            return false;
        }
        self.state = BrowsingState {
            filter,
            current_index: 0,
        };
        true
    }

    pub fn is_animating(&self) -> bool {
        self.clock.now_ms() < self.transition_until
    }

    pub fn direction(&self) -> Option<Direction> {
        if self.is_animating() {
            self.direction
        } else {
            None
        }
    }

    pub fn next(&mut self) -> bool {
        if self.is_animating() || self.state.current_index + 1 >= self.filtered_len() {
            return false;
        }
        self.state.current_index += 1;
        self.begin_transition(Direction::Left);
        true
    }

    pub fn previous(&mut self) -> bool {
        if self.is_animating() || self.state.current_index == 0 {
            return false;
        }
        self.state.current_index -= 1;
        self.begin_transition(Direction::Right);
        true
    }

    fn begin_transition(&mut self, direction: Direction) {
        self.direction = Some(direction);
        self.transition_until = self.clock.now_ms().saturating_add(TRANSITION_MS);
    }

    /// Leftward drag past the threshold advances, rightward goes back.
    pub fn swipe(&mut self, start_x: f64, end_x: f64) -> bool {
        let diff = start_x - end_x;
        if diff.abs() <= SWIPE_THRESHOLD {
            return false;
        }
        if diff > 0.0 {
            self.next()
        } else {
            self.previous()
        }
    }

    pub fn touch_start(&mut self, x: f64) {
        self.touch = Some(Touch {
            start_x: x,
            end_x: None,
        });
    }

    pub fn touch_move(&mut self, x: f64) {
        if let Some(t) = self.touch.as_mut() {
            t.end_x = Some(x);
        }
    }

    /// A touch with no movement is a tap, not a swipe.
    pub fn touch_end(&mut self) -> bool {
        match self.touch.take() {
            Some(Touch {
                start_x,
                end_x: Some(end_x),
            }) => self.swipe(start_x, end_x),
            _ => false,
        }
    }

    /// Swaps in a new ranked list, keeping the filter.
    pub fn replace_items(&mut self, items: Vec<AnalyzedBill>) {
        self.items = items;
        self.clamp_index();
    }

    fn clamp_index(&mut self) {
        let n = self.filtered_len();
        if n == 0 {
            self.state.current_index = 0;
        } else if self.state.current_index >= n {
            self.state.current_index = n - 1;
        }
    }
}
