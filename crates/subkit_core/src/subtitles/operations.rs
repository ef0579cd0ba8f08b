//! Document-level transformations.
//!
//! All operations mutate the document in place.

use std::collections::BTreeSet;
use std::time::Duration;

use chrono::TimeDelta;

use super::types::{Document, Item, Line};

/// Signed nanoseconds of a duration.
fn nanos(d: Duration) -> i128 {
    d.as_nanos() as i128
}

/// Duration from signed nanoseconds, clamped at zero.
fn from_nanos(n: i128) -> Duration {
    let n = n.clamp(0, u64::MAX as i128 * 1_000_000_000);
    Duration::new((n / 1_000_000_000) as u64, (n % 1_000_000_000) as u32)
}

impl Document {
    /// True when the document has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// End of the last item, zero when empty.
    pub fn duration(&self) -> Duration {
        self.items.last().map(|i| i.end_at).unwrap_or_default()
    }

    /// Shift every item by `offset`, which may be negative.
    ///
    /// Items pushed entirely before zero are removed; items straddling zero
    /// start at zero.
    pub fn add(&mut self, offset: TimeDelta) {
        let delta = offset
            .num_nanoseconds()
            .map(i128::from)
            .unwrap_or_else(|| i128::from(offset.num_milliseconds()) * 1_000_000);

        self.items.retain_mut(|item| {
            let start = nanos(item.start_at) + delta;
            let end = nanos(item.end_at) + delta;
            if start <= 0 && end <= 0 {
                return false;
            }
            item.start_at = from_nanos(start);
            item.end_at = from_nanos(end);
            true
        });
    }

    /// Drop leading items starting before `from` and trailing items ending
    /// after `to`.
    pub fn trim(&mut self, from: Duration, to: Duration) {
        let leading = self
            .items
            .iter()
            .take_while(|item| item.start_at < from)
            .count();
        self.items.drain(..leading);

        while self.items.last().is_some_and(|item| item.end_at > to) {
            self.items.pop();
        }
    }

    /// Make the document last exactly `d`.
    ///
    /// Longer documents are cut at `d`. Shorter ones get a one millisecond
    /// `...` item ending at `d` when `add_dummy_item` is set.
    pub fn force_duration(&mut self, d: Duration, add_dummy_item: bool) {
        if self.duration() == d {
            return;
        }

        if self.duration() > d {
            if let Some(last) = self.items.iter().position(|item| item.start_at >= d) {
                self.items.truncate(last);
            }
            for item in &mut self.items {
                if item.end_at > d {
                    item.end_at = d;
                }
            }
        }

        if add_dummy_item && self.duration() < d {
            self.items.push(Item::with_text(
                d.saturating_sub(Duration::from_millis(1)),
                d,
                "...",
            ));
        }
    }

    /// Split items at every multiple of `fragment` that falls strictly
    /// inside them, then order.
    ///
    /// Boundaries are compared at millisecond precision, the resolution of
    /// every output format.
    pub fn fragment(&mut self, fragment: Duration) {
        let step = fragment.as_millis();
        if self.items.is_empty() || step == 0 {
            return;
        }

        let mut fragmented = Vec::with_capacity(self.items.len());
        for item in self.items.drain(..) {
            let end = item.end_at.as_millis();
            let mut current = item;
            let mut boundary = (current.start_at.as_millis() / step + 1) * step;
            while boundary < end {
                let cut = Duration::from_millis(boundary as u64);
                let mut head = current.clone();
                head.end_at = cut;
                current.start_at = cut;
                fragmented.push(head);
                boundary += step;
            }
            fragmented.push(current);
        }
        self.items = fragmented;

        self.order();
    }

    /// Append `other`'s items and adopt its regions and styles whose IDs
    /// are not taken yet.
    pub fn merge(&mut self, other: Document) {
        self.items.extend(other.items);
        self.order();

        for (id, region) in other.regions {
            self.regions.entry(id).or_insert(region);
        }
        for (id, style) in other.styles {
            self.styles.entry(id).or_insert(style);
        }
    }

    /// Remove regions and styles nothing refers to, then items without
    /// lines.
    pub fn optimize(&mut self) {
        if self.items.is_empty() {
            return;
        }

        let mut used_regions = BTreeSet::new();
        let mut used_styles = BTreeSet::new();
        for item in &self.items {
            used_regions.extend(item.region.iter().cloned());
            used_styles.extend(item.style.iter().cloned());
            for line in &item.lines {
                for line_item in &line.items {
                    used_styles.extend(line_item.style.iter().cloned());
                }
            }
        }

        self.regions.retain(|id, _| used_regions.contains(id));
        for region in self.regions.values() {
            used_styles.extend(region.style.iter().cloned());
        }
        self.styles.retain(|id, _| used_styles.contains(id));

        self.items.retain(|item| !item.lines.is_empty());
    }

    /// Stable sort by start time.
    pub fn order(&mut self) {
        self.items.sort_by_key(|item| item.start_at);
    }

    /// Drop every region, style and inline style.
    pub fn remove_styling(&mut self) {
        self.regions.clear();
        self.styles.clear();
        for item in &mut self.items {
            item.region = None;
            item.style = None;
            item.inline_style = None;
            for line in &mut item.lines {
                for line_item in &mut line.items {
                    line_item.inline_style = None;
                    line_item.style = None;
                }
            }
        }
    }

    /// Merge items with identical text whose time ranges touch or overlap.
    pub fn unfragment(&mut self) {
        if self.items.len() <= 1 {
            return;
        }

        self.order();

        let mut i = 0;
        while i + 1 < self.items.len() {
            let text = self.items[i].to_string();
            let mut j = i + 1;
            while j < self.items.len() {
                let (end_i, start_j, end_j) = (
                    self.items[i].end_at,
                    self.items[j].start_at,
                    self.items[j].end_at,
                );
                if end_i >= start_j && self.items[j].to_string() == text {
                    if end_i < end_j {
                        self.items[i].end_at = end_j;
                    }
                    self.items.remove(j);
                } else if end_i < start_j {
                    break;
                } else {
                    j += 1;
                }
            }
            i += 1;
        }
    }

    /// Remap times linearly so that `actual1 -> desired1` and
    /// `actual2 -> desired2`.
    pub fn apply_linear_correction(
        &mut self,
        actual1: Duration,
        desired1: Duration,
        actual2: Duration,
        desired2: Duration,
    ) {
        let span = nanos(actual2) - nanos(actual1);
        if span == 0 {
            tracing::warn!("linear correction needs two distinct reference points");
            return;
        }
        let a = (nanos(desired2) - nanos(desired1)) as f64 / span as f64;
        let b = nanos(desired1) as f64 - a * nanos(actual1) as f64;

        let correct = |d: Duration| from_nanos((a * nanos(d) as f64 + b).round() as i128);
        for item in &mut self.items {
            item.start_at = correct(item.start_at);
            item.end_at = correct(item.end_at);
        }
    }
}

impl Line {
    /// True when every run is blank.
    pub fn is_blank(&self) -> bool {
        self.items.iter().all(|i| i.text.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subtitles::types::{LineItem, Region, Style};

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    fn item(start: u64, end: u64, text: &str) -> Item {
        Item::with_text(secs(start), secs(end), text)
    }

    fn mock() -> Document {
        Document {
            items: vec![item(1, 3, "subtitle-1"), item(3, 7, "subtitle-2")],
            ..Default::default()
        }
    }

    fn bounds(doc: &Document) -> Vec<(u64, u64)> {
        doc.items
            .iter()
            .map(|i| (i.start_at.as_secs(), i.end_at.as_secs()))
            .collect()
    }

    #[test]
    fn add_shifts_and_drops() {
        let mut doc = mock();
        doc.add(TimeDelta::seconds(1));
        assert_eq!(bounds(&doc), vec![(2, 4), (4, 8)]);

        doc.add(TimeDelta::seconds(-3));
        assert_eq!(bounds(&doc), vec![(0, 1), (1, 5)]);

        doc.add(TimeDelta::seconds(-2));
        assert_eq!(doc.items.len(), 1);
        assert_eq!(doc.items[0].to_string(), "subtitle-2");
    }

    #[test]
    fn duration_and_is_empty() {
        assert_eq!(Document::default().duration(), Duration::ZERO);
        assert!(Document::default().is_empty());
        assert_eq!(mock().duration(), secs(7));
        assert!(!mock().is_empty());
    }

    #[test]
    fn trim_both_ends() {
        let mut doc = Document {
            items: vec![item(0, 1, "a"), item(2, 3, "b"), item(4, 9, "c")],
            ..Default::default()
        };
        doc.trim(secs(1), secs(5));
        assert_eq!(bounds(&doc), vec![(2, 3)]);
    }

    #[test]
    fn force_duration_variants() {
        let mut doc = mock();
        doc.force_duration(secs(10), false);
        assert_eq!(doc.items.len(), 2);

        let mut doc = mock();
        doc.force_duration(secs(10), true);
        assert_eq!(doc.items.len(), 3);
        assert_eq!(doc.items[2].end_at, secs(10));
        assert_eq!(doc.items[2].start_at, secs(10) - Duration::from_millis(1));
        assert_eq!(doc.items[2].lines, vec![Line::from_text("...")]);

        doc.items[2].start_at = secs(7);
        doc.items[2].end_at = secs(12);
        doc.force_duration(secs(10), true);
        assert_eq!(doc.items.len(), 3);
        assert_eq!(doc.items[2].start_at, secs(7));
        assert_eq!(doc.items[2].end_at, secs(10));

        let mut doc = mock();
        doc.force_duration(secs(3), false);
        assert_eq!(bounds(&doc), vec![(1, 3)]);
    }

    #[test]
    fn fragment_then_unfragment() {
        let mut doc = mock();
        doc.fragment(secs(2));
        assert_eq!(bounds(&doc), vec![(1, 2), (2, 3), (3, 4), (4, 6), (6, 7)]);
        assert_eq!(doc.items[1].to_string(), "subtitle-1");
        assert_eq!(doc.items[4].to_string(), "subtitle-2");

        doc.items.insert(4, item(4, 5, "subtitle-3"));
        doc.unfragment();
        assert_eq!(bounds(&doc), vec![(1, 3), (3, 7), (4, 5)]);
        assert_eq!(doc.items[2].to_string(), "subtitle-3");
    }

    #[test]
    fn unfragment_handles_nesting_and_disorder() {
        let mut doc = Document {
            items: vec![
                item(1, 2, "subtitle-1"),
                item(2, 5, "subtitle-2"),
                item(3, 4, "subtitle-3"),
                item(3, 4, "subtitle-2"),
                item(4, 5, "subtitle-3"),
                item(6, 7, "subtitle-3"),
                item(0, 3, "subtitle-1"),
            ],
            ..Default::default()
        };
        doc.unfragment();
        assert_eq!(
            doc.items,
            vec![
                item(0, 3, "subtitle-1"),
                item(2, 5, "subtitle-2"),
                item(3, 5, "subtitle-3"),
                item(6, 7, "subtitle-3"),
            ]
        );
    }

    #[test]
    fn merge_orders_and_dedups() {
        let region = |id: &str| {
            (
                id.to_string(),
                Region {
                    id: id.to_string(),
                    ..Default::default()
                },
            )
        };
        let mut a = Document {
            items: vec![item(1, 3, ""), item(5, 8, ""), item(10, 12, "")],
            regions: [region("r0"), region("r1")].into_iter().collect(),
            ..Default::default()
        };
        let b = Document {
            items: vec![item(2, 4, ""), item(6, 7, ""), item(9, 11, ""), item(13, 14, "")],
            regions: [region("r1"), region("r2")].into_iter().collect(),
            ..Default::default()
        };
        a.merge(b);
        assert_eq!(
            bounds(&a),
            vec![(1, 3), (2, 4), (5, 8), (6, 7), (9, 11), (10, 12), (13, 14)]
        );
        assert_eq!(a.regions.len(), 3);
    }

    #[test]
    fn optimize_prunes_unused() {
        let style = |id: &str| {
            (
                id.to_string(),
                Style {
                    id: id.to_string(),
                    ..Default::default()
                },
            )
        };
        let region = |id: &str, style: &str| {
            (
                id.to_string(),
                Region {
                    id: id.to_string(),
                    style: Some(style.to_string()),
                    ..Default::default()
                },
            )
        };
        let mut doc = Document {
            items: vec![
                Item {
                    region: Some("1".to_string()),
                    ..Default::default()
                },
                Item {
                    style: Some("1".to_string()),
                    ..Default::default()
                },
                Item {
                    lines: vec![Line {
                        items: vec![LineItem {
                            style: Some("2".to_string()),
                            ..Default::default()
                        }],
                        voice_name: None,
                    }],
                    ..Default::default()
                },
            ],
            regions: [region("1", "3"), region("2", "4")].into_iter().collect(),
            styles: ["1", "2", "3", "4", "5"].into_iter().map(style).collect(),
            metadata: None,
        };
        doc.optimize();
        assert_eq!(doc.regions.len(), 1);
        assert_eq!(doc.styles.keys().collect::<Vec<_>>(), vec!["1", "2", "3"]);
        assert_eq!(doc.items.len(), 1);
    }

    #[test]
    fn order_is_stable() {
        let mut doc = Document {
            items: vec![item(4, 5, "a"), item(2, 3, "b"), item(2, 9, "c"), item(1, 2, "d")],
            ..Default::default()
        };
        doc.order();
        let texts: Vec<String> = doc.items.iter().map(|i| i.to_string()).collect();
        assert_eq!(texts, vec!["d", "b", "c", "a"]);
        let once = doc.clone();
        doc.order();
        assert_eq!(doc, once);
    }

    #[test]
    fn remove_styling_clears_everything() {
        let mut doc = mock();
        doc.items[0].region = Some("r".to_string());
        doc.items[0].style = Some("s".to_string());
        doc.items[0].inline_style = Some(Default::default());
        doc.items[0].lines[0].items[0].inline_style = Some(Default::default());
        doc.regions.insert("r".to_string(), Region::default());
        doc.styles.insert("s".to_string(), Style::default());

        doc.remove_styling();
        assert!(doc.regions.is_empty());
        assert!(doc.styles.is_empty());
        assert_eq!(doc.items[0], item(1, 3, "subtitle-1"));
    }

    #[test]
    fn linear_correction() {
        let mut doc = Document {
            items: vec![item(1, 2, ""), item(3, 5, ""), item(7, 10, "")],
            ..Default::default()
        };
        doc.apply_linear_correction(secs(3), secs(5), secs(5), secs(8));
        let ms: Vec<(u128, u128)> = doc
            .items
            .iter()
            .map(|i| (i.start_at.as_millis(), i.end_at.as_millis()))
            .collect();
        assert_eq!(ms, vec![(2000, 3500), (5000, 8000), (11000, 15500)]);
    }
}
