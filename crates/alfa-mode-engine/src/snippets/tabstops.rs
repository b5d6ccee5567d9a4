//! Live tracking of inserted tabstops.
//!
//! After a snippet is inserted its tabstops become groups of document
//! ranges. The manager keeps those ranges in step with every edit, moves
//! the selection between groups on Tab, rewrites mirror regions when the
//! authoritative region changes, and detaches itself as soon as the user
//! leaves the snippet: tabbing to the last stop, cancelling, moving the
//! caret outside the active group, or deleting across its bounds.
//!
//! Text typed at a boundary shared by two regions goes to the region being
//! edited. A region that encloses the edited one (a placeholder around a
//! nested tabstop, or the tabstop a nested snippet was expanded in) grows
//! with it; a neighbouring region moves out of the way.
//!
//! Every operation on a detached manager does nothing.

use crate::editing::{Bias, Change, ChangeAction, EditorHost, MarkerId, Position, Range, SelectionEvent};
use crate::snippets::expand::TabstopLayout;
use crate::snippets::template::Transform;

/// One tracked occurrence of a tabstop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub range: Range,
    /// Rewritten from the authoritative region instead of being edited
    pub linked: bool,
    pub transform: Option<Transform>,
    pub tabstop: u32,
    marker: Option<MarkerId>,
    /// Number of regions enclosing this one when it was added
    depth: usize,
    /// Target of the mirror update in progress
    rewriting: bool,
}

impl Region {
    fn new(range: Range, tabstop: u32, transform: Option<Transform>, marker: MarkerId) -> Self {
        Self {
            range,
            linked: transform.is_some(),
            transform,
            tabstop,
            marker: Some(marker),
            depth: 0,
            rewriting: false,
        }
    }
}

/// `outer` strictly contains `inner`. An empty range on the boundary of
/// another one sits next to it, not inside it.
fn encloses(outer: &Range, inner: &Range) -> bool {
    outer != inner
        && outer.covers(inner.start, inner.end)
        && (!inner.is_empty() || (outer.start < inner.start && inner.end < outer.end))
}

/// A group of regions visited together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tabstop {
    pub id: u32,
    pub regions: Vec<Region>,
    pub choices: Vec<String>,
}

impl Tabstop {
    /// Index of the region mirrors are computed from.
    pub fn first_non_linked(&self) -> Option<usize> {
        self.regions.iter().position(|r| !r.linked)
    }

    pub fn has_linked_ranges(&self) -> bool {
        self.first_non_linked().is_some() && self.regions.iter().any(|r| r.linked)
    }
}

#[derive(Debug)]
pub struct TabstopManager {
    tabstops: Vec<Tabstop>,
    index: Option<usize>,
    attached: bool,
}

impl Default for TabstopManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TabstopManager {
    pub fn new() -> Self {
        Self {
            tabstops: Vec::new(),
            index: None,
            attached: true,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Position of the selected group in traversal order.
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn tabstops(&self) -> &[Tabstop] {
        &self.tabstops
    }

    pub fn selected(&self) -> Option<&Tabstop> {
        self.index.and_then(|i| self.tabstops.get(i))
    }

    /// Choice list of the selected tabstop, for a completion popup.
    pub fn choices(&self) -> Option<&[String]> {
        self.selected()
            .map(|t| t.choices.as_slice())
            .filter(|c| !c.is_empty())
    }

    /// Track the tabstops of a snippet inserted between `start` and `end`.
    ///
    /// Region positions in `layouts` are relative to `start`. A final
    /// tabstop at `end` is added when the snippet has no `$0`. The new
    /// groups go right after the selected one, final group last, and the
    /// first of them is selected.
    pub fn add_tabstops<H: EditorHost + ?Sized>(
        &mut self,
        host: &mut H,
        layouts: &[TabstopLayout],
        start: Position,
        end: Position,
    ) {
        if !self.attached {
            return;
        }

        let mut groups: Vec<Tabstop> = Vec::with_capacity(layouts.len() + 1);
        let mut final_group = None;
        for layout in layouts {
            let regions = layout
                .regions
                .iter()
                .map(|region| {
                    let range = Range::new(region.range.start.offset_from(start), region.range.end.offset_from(start));
                    let marker = host.add_marker(&range);
                    Region::new(range, layout.id, region.transform.clone(), marker)
                })
                .collect();
            let group = Tabstop {
                id: layout.id,
                regions,
                choices: layout.choices.clone(),
            };
            if layout.id == 0 {
                final_group = Some(group);
            } else {
                groups.push(group);
            }
        }

        let final_group = final_group.unwrap_or_else(|| {
            let range = Range::point(end);
            let marker = host.add_marker(&range);
            Tabstop {
                id: 0,
                regions: vec![Region::new(range, 0, None, marker)],
                choices: Vec::new(),
            }
        });
        groups.push(final_group);

        // A snippet expanded inside a tracked region nests below it.
        let base = if start == end {
            0
        } else {
            self.tabstops
                .iter()
                .flat_map(|g| &g.regions)
                .filter(|r| r.range.covers(start, end))
                .map(|r| r.depth + 1)
                .max()
                .unwrap_or(0)
        };
        let ranges: Vec<Range> = groups.iter().flat_map(|g| g.regions.iter().map(|r| r.range)).collect();
        for region in groups.iter_mut().flat_map(|g| g.regions.iter_mut()) {
            region.depth = base + ranges.iter().filter(|outer| encloses(outer, &region.range)).count();
        }

        let at = self.index.map_or(0, |i| i + 1).min(self.tabstops.len());
        self.tabstops.splice(at..at, groups);
        log::debug!("tracking {} tabstop groups", self.tabstops.len());
        self.select(host, at);
        if at + 1 == self.tabstops.len() {
            self.detach(host);
        }
    }

    /// Move `direction` groups forward (negative: backward), staying within
    /// the first and last group. Reaching the last group detaches.
    pub fn tab_next<H: EditorHost + ?Sized>(&mut self, host: &mut H, direction: isize) {
        if !self.attached || self.tabstops.is_empty() {
            return;
        }
        let last = self.tabstops.len() - 1;
        let current = self.index.map_or(-1, |i| i as isize);
        let index = (current + direction).clamp(0, last as isize) as usize;

        self.select(host, index);
        if index == last {
            self.detach(host);
        }
    }

    /// Select a group: its non-linked regions become the selections, with
    /// the authoritative region primary.
    pub fn select<H: EditorHost + ?Sized>(&mut self, host: &mut H, index: usize) {
        if !self.attached || index >= self.tabstops.len() {
            return;
        }
        if let Some(old) = self.index.filter(|old| *old != index)
            && let Some(group) = self.tabstops.get_mut(old)
        {
            for region in &mut group.regions {
                if region.marker.is_none() {
                    region.marker = Some(host.add_marker(&region.range));
                }
            }
        }

        self.index = Some(index);
        let group = &mut self.tabstops[index];
        for region in &mut group.regions {
            if let Some(marker) = region.marker.take() {
                host.remove_marker(marker);
            }
        }

        let primary = group.first_non_linked().unwrap_or(0);
        let Some(primary_range) = group.regions.get(primary).map(|r| r.range) else {
            return;
        };
        let others: Vec<Range> = group
            .regions
            .iter()
            .enumerate()
            .filter(|(i, r)| *i != primary && !r.linked)
            .map(|(_, r)| r.range)
            .collect();
        host.set_selections(primary_range, &others);
    }

    /// Carry every region through a document change.
    ///
    /// `internal` marks edits made by the manager itself (mirror updates);
    /// they skip the check that a deletion stays within the selected group.
    pub fn on_change<H: EditorHost + ?Sized>(&mut self, host: &mut H, change: &Change, internal: bool) {
        if !self.attached {
            return;
        }

        if !internal
            && change.is_removal()
            && let Some(selected) = self.selected()
            && !selected.regions.iter().any(|r| r.range.covers(change.start, change.end))
        {
            log::debug!("deletion {}-{} left the active tabstop", change.start, change.end);
            self.detach(host);
            return;
        }

        let selected = self.index;
        let absorbs = |group: usize, region: &Region| match (internal, selected) {
            (true, _) => region.rewriting,
            (false, Some(selected)) => group == selected && !region.linked,
            (false, None) => true,
        };
        let editing: Vec<(Range, usize)> = self
            .tabstops
            .iter()
            .enumerate()
            .flat_map(|(g, group)| group.regions.iter().map(move |r| (g, r)))
            .filter(|(g, r)| absorbs(*g, *r))
            .map(|(_, r)| (r.range, r.depth))
            .collect();

        for (g, group) in self.tabstops.iter_mut().enumerate() {
            group.regions.retain_mut(|region| {
                let swallowed =
                    change.is_removal() && change.start < region.range.start && change.end > region.range.end;
                if !swallowed {
                    let grows = absorbs(g, region)
                        || editing
                            .iter()
                            .any(|(range, depth)| region.depth < *depth && region.range.covers(range.start, range.end));
                    region.range = match change.action {
                        ChangeAction::Insert if !grows && region.range.start == change.start => {
                            region.range.transform_biased(change, Bias::Right, Bias::Right)
                        }
                        ChangeAction::Insert if !grows => region.range.transform_biased(change, Bias::Left, Bias::Left),
                        _ => region.range.transform(change),
                    };
                }
                if swallowed || region.range.is_inverted() {
                    if let Some(marker) = region.marker.take() {
                        host.remove_marker(marker);
                    }
                    return false;
                }
                true
            });
        }
        self.drop_empty_groups();

        if self.tabstops.is_empty() {
            self.detach(host);
        }
    }

    fn drop_empty_groups(&mut self) {
        let mut i = self.tabstops.len();
        while i > 0 {
            i -= 1;
            if !self.tabstops[i].regions.is_empty() {
                continue;
            }
            self.tabstops.remove(i);
            self.index = match self.index {
                Some(selected) if selected > i => Some(selected - 1),
                Some(selected) if selected == i => None,
                other => other,
            };
        }
    }

    /// Rewrite the linked regions of the selected group from its
    /// authoritative region, passing the text through each region's
    /// transform.
    pub fn update_linked_fields<H: EditorHost + ?Sized>(
        &mut self,
        host: &mut H,
        format: &dyn Fn(&str, &Transform) -> String,
    ) {
        let Some(selected) = self.selected() else {
            return;
        };
        if !self.attached || !selected.has_linked_ranges() {
            return;
        }
        let Some(source) = selected.first_non_linked().map(|i| selected.regions[i].range) else {
            return;
        };
        let text = host.text_range(&source);
        let group_id = selected.id;

        // Each replace moves later regions, so ranges are re-read every time.
        let mut done = 0;
        loop {
            let Some(g) = self.index.filter(|&i| self.tabstops.get(i).is_some_and(|t| t.id == group_id)) else {
                return;
            };
            let Some(r) = self.tabstops[g]
                .regions
                .iter()
                .enumerate()
                .filter(|(_, region)| region.linked)
                .nth(done)
                .map(|(i, _)| i)
            else {
                return;
            };
            let region = &mut self.tabstops[g].regions[r];
            let range = region.range;
            let formatted = match &region.transform {
                Some(transform) => format(&text, transform),
                None => text.clone(),
            };
            done += 1;

            if host.text_range(&range) == formatted {
                continue;
            }
            region.rewriting = true;
            let (changes, _) = Change::replacement(range, &formatted);
            host.replace(&range, &formatted);
            for change in &changes {
                self.on_change(host, change, true);
            }
            for region in self.tabstops.iter_mut().flat_map(|g| g.regions.iter_mut()) {
                region.rewriting = false;
            }
            if !self.attached {
                return;
            }
        }
    }

    /// Detach unless the selection stays inside a non-linked region of the
    /// selected group (any region while no group is selected).
    pub fn on_selection_change<H: EditorHost + ?Sized>(&mut self, host: &mut H, event: &SelectionEvent) {
        if !self.attached {
            return;
        }
        let inside = |region: &Region| {
            region.range.contains(event.lead) && (event.is_empty || region.range.contains(event.anchor))
        };
        let stays = match self.selected() {
            Some(group) => group.regions.iter().filter(|r| !r.linked).any(inside),
            None => self.tabstops.iter().flat_map(|g| g.regions.iter()).any(inside),
        };
        if !stays {
            log::debug!("selection left the snippet at {}", event.lead);
            self.detach(host);
        }
    }

    /// Stop tracking and remove every highlight.
    pub fn detach<H: EditorHost + ?Sized>(&mut self, host: &mut H) {
        if !self.attached {
            return;
        }
        for group in &mut self.tabstops {
            for region in &mut group.regions {
                if let Some(marker) = region.marker.take() {
                    host.remove_marker(marker);
                }
            }
        }
        self.tabstops.clear();
        self.index = None;
        self.attached = false;
    }
}
