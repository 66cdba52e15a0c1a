//! Glyph resolution and renumbering for font subsets.

use crate::{
    alloc::{BTreeMap, BTreeSet, Vec},
    font::{Glyph, GlyphWithMetrics, Outlines},
    Font, SubsetError,
};

/// Outline statistics for a single glyph with composite glyphs flattened.
#[derive(Debug, Clone, Copy, Default)]
struct GlyphStats {
    points: u32,
    contours: u32,
    /// 0 for simple glyphs, 1 for composites of simple glyphs etc.
    depth: u16,
}

/// Maximum values over the glyphs in a subset, as recorded in the `maxp` table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct OutlineStats {
    pub(crate) max_points: u32,
    pub(crate) max_contours: u32,
    pub(crate) max_composite_points: u32,
    pub(crate) max_composite_contours: u32,
    pub(crate) max_size_of_instructions: u16,
    pub(crate) max_component_elements: u16,
    pub(crate) max_component_depth: u16,
}

impl OutlineStats {
    fn update(&mut self, glyph: &Glyph<'_>, stats: GlyphStats) {
        match glyph {
            Glyph::Empty => { /* no outlines */ }
            Glyph::Simple(simple) => {
                self.max_points = self.max_points.max(stats.points);
                self.max_contours = self.max_contours.max(stats.contours);
                self.max_size_of_instructions =
                    self.max_size_of_instructions.max(simple.instructions_len);
            }
            Glyph::Composite(composite) => {
                self.max_composite_points = self.max_composite_points.max(stats.points);
                self.max_composite_contours = self.max_composite_contours.max(stats.contours);
                self.max_size_of_instructions =
                    self.max_size_of_instructions.max(composite.instructions_len());
                let component_count = u16::try_from(composite.components.len()).unwrap_or(u16::MAX);
                self.max_component_elements = self.max_component_elements.max(component_count);
                self.max_component_depth = self.max_component_depth.max(stats.depth);
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum VisitState {
    /// Glyph is on the traversal stack.
    Visiting,
    Done(GlyphStats),
}

/// Subset of a [`Font`] produced by removing some of its glyphs and related data.
///
/// Glyphs are renumbered densely: the missing glyph (0) stays at index 0, and other
/// retained glyphs follow in the ascending order of their original indices.
#[derive(Debug)]
pub struct FontSubset<'a> {
    pub(crate) font: Font<'a>,
    requested_char_count: usize,
    /// Resolved chars in the ascending order together with *new* glyph indices.
    pub(crate) char_map: Vec<(char, u16)>,
    missing_chars: Vec<char>,
    old_to_new_glyph_idx: BTreeMap<u16, u16>,
    /// Original glyph index for each new glyph index.
    original_glyph_ids: Vec<u16>,
    /// Retained glyphs in the new order, with remapped component references.
    pub(crate) glyphs: Vec<GlyphWithMetrics<'a>>,
    pub(crate) outline_stats: OutlineStats,
}

impl<'a> FontSubset<'a> {
    /// Creates a subset of the `font` containing glyphs for the specified chars.
    ///
    /// Chars not mapped by the font are recorded as [missing](Self::missing_chars()); they do not
    /// cause an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the font outlines cannot be subset, or if composite glyphs
    /// reference each other in a cycle.
    pub fn new(font: Font<'a>, chars: &BTreeSet<char>) -> Result<Self, SubsetError> {
        let all_glyphs = match &font.outlines {
            Outlines::TrueType(glyphs) => glyphs,
            Outlines::Cff(tag) => return Err(SubsetError::UnsupportedOutlines(*tag)),
        };

        let mut old_char_map = Vec::with_capacity(chars.len());
        let mut missing_chars = Vec::new();
        for &ch in chars {
            match font.map_char(ch) {
                0 => missing_chars.push(ch),
                glyph_idx => old_char_map.push((ch, glyph_idx)),
            }
        }
        if !missing_chars.is_empty() {
            log::debug!(
                "{} of {} chars are not mapped by the font: {missing_chars:?}",
                missing_chars.len(),
                chars.len()
            );
        }

        // The missing glyph is always retained.
        let roots = [0].into_iter().chain(old_char_map.iter().map(|&(_, idx)| idx));
        let states = Self::close_over_components(all_glyphs, roots)?;

        let mut old_to_new_glyph_idx = BTreeMap::new();
        let mut original_glyph_ids = Vec::with_capacity(states.len());
        let mut outline_stats = OutlineStats::default();
        for (new_idx, (&old_idx, state)) in states.iter().enumerate() {
            let new_idx = u16::try_from(new_idx).expect("subset cannot have more glyphs than font");
            old_to_new_glyph_idx.insert(old_idx, new_idx);
            original_glyph_ids.push(old_idx);
            if let VisitState::Done(stats) = state {
                outline_stats.update(&all_glyphs[usize::from(old_idx)].inner, *stats);
            }
        }

        let glyphs = original_glyph_ids
            .iter()
            .map(|&old_idx| {
                let mut glyph = all_glyphs[usize::from(old_idx)].clone();
                if let Glyph::Composite(composite) = &mut glyph.inner {
                    for component in &mut composite.components {
                        component.glyph_idx = *old_to_new_glyph_idx
                            .get(&component.glyph_idx)
                            .expect("component glyph is not retained");
                    }
                }
                glyph
            })
            .collect();
        let char_map = old_char_map
            .into_iter()
            .map(|(ch, old_idx)| (ch, old_to_new_glyph_idx[&old_idx]))
            .collect();

        log::debug!(
            "retained {} of {} glyphs",
            original_glyph_ids.len(),
            all_glyphs.len()
        );
        Ok(Self {
            font,
            requested_char_count: chars.len(),
            char_map,
            missing_chars,
            old_to_new_glyph_idx,
            original_glyph_ids,
            glyphs,
            outline_stats,
        })
    }

    /// Computes the closure of `roots` over composite glyph references using iterative DFS.
    /// Glyph stats are computed in post-order, i.e., after stats for all components.
    fn close_over_components(
        all_glyphs: &[GlyphWithMetrics<'_>],
        roots: impl Iterator<Item = u16>,
    ) -> Result<BTreeMap<u16, VisitState>, SubsetError> {
        let mut states = BTreeMap::new();
        let mut stack = Vec::new();
        for root in roots {
            if states.contains_key(&root) {
                continue;
            }
            states.insert(root, VisitState::Visiting);
            stack.push((root, 0_usize));

            while let Some((glyph_idx, next_component)) = stack.last_mut() {
                let glyph_idx = *glyph_idx;
                let glyph = &all_glyphs[usize::from(glyph_idx)].inner;
                let component = glyph.component_indices().nth(*next_component);
                *next_component += 1;

                if let Some(component_idx) = component {
                    match states.get(&component_idx) {
                        None => {
                            states.insert(component_idx, VisitState::Visiting);
                            stack.push((component_idx, 0));
                        }
                        Some(VisitState::Visiting) => {
                            return Err(SubsetError::CyclicComposite {
                                glyph_idx: component_idx,
                            });
                        }
                        Some(VisitState::Done(_)) => { /* already processed */ }
                    }
                } else {
                    let stats = Self::glyph_stats(glyph, &states);
                    states.insert(glyph_idx, VisitState::Done(stats));
                    stack.pop();
                }
            }
        }
        Ok(states)
    }

    fn glyph_stats(glyph: &Glyph<'_>, states: &BTreeMap<u16, VisitState>) -> GlyphStats {
        match glyph {
            Glyph::Empty => GlyphStats::default(),
            Glyph::Simple(simple) => GlyphStats {
                points: simple.point_count.into(),
                contours: simple.contour_count.into(),
                depth: 0,
            },
            Glyph::Composite(_) => {
                let mut stats = GlyphStats::default();
                for component_idx in glyph.component_indices() {
                    let Some(VisitState::Done(component)) = states.get(&component_idx) else {
                        unreachable!("components are processed before the composite glyph");
                    };
                    // Shared components may be counted many times
                    stats.points = stats.points.saturating_add(component.points);
                    stats.contours = stats.contours.saturating_add(component.contours);
                    stats.depth = stats.depth.max(component.depth.saturating_add(1));
                }
                stats
            }
        }
    }

    /// Returns the number of distinct chars requested for the subset.
    pub fn requested_char_count(&self) -> usize {
        self.requested_char_count
    }

    /// Returns the number of requested chars mapped to a glyph in the subset.
    pub fn resolved_char_count(&self) -> usize {
        self.char_map.len()
    }

    /// Returns requested chars not mapped by the font, in the ascending order.
    pub fn missing_chars(&self) -> &[char] {
        &self.missing_chars
    }

    /// Returns the number of glyphs in the subset, including the missing glyph.
    pub fn glyph_count(&self) -> u16 {
        // Cannot overflow: the subset has no more glyphs than the original font
        u16::try_from(self.glyphs.len()).unwrap_or(u16::MAX)
    }

    /// Returns the index in the subset for a glyph with the specified index in the original font,
    /// or `None` if the glyph is not retained.
    pub fn new_glyph_idx(&self, original_idx: u16) -> Option<u16> {
        self.old_to_new_glyph_idx.get(&original_idx).copied()
    }

    /// Returns original glyph indices, indexed by the glyph index in the subset.
    pub fn original_glyph_ids(&self) -> &[u16] {
        &self.original_glyph_ids
    }

    /// Maps a char to a glyph index in the subset, returning 0 for unmapped chars.
    pub fn map_char(&self, ch: char) -> u16 {
        self.char_map
            .binary_search_by_key(&ch, |&(mapped_ch, _)| mapped_ch)
            .map_or(0, |pos| self.char_map[pos].1)
    }
}
