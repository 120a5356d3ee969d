use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use glam::vec2;

use super::LayoutController;

fn fuzzy_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_lowercase(), &query.to_lowercase()))
}

impl LayoutController {
    /// Node under a screen-space point, nearest first when several are in reach.
    pub fn node_at(&self, screen_x: f32, screen_y: f32) -> Option<&str> {
        let world = self
            .viewport
            .screen_to_world(self.frame(), vec2(screen_x, screen_y));
        if !world.is_finite() {
            return None;
        }

        self.hit_index
            .query_circle(world.x, world.y, self.options.hit_radius())
            .into_iter()
            .map(|point| (point, point.distance_sq_to(world.x, world.y)))
            .min_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.id.cmp(&b.0.id)))
            .map(|(point, _)| point.id.as_str())
    }

    /// Hit-tests a pointer press. A hit selects the node and notifies the
    /// click callback; a miss clears the selection.
    pub fn click(&mut self, screen_x: f32, screen_y: f32) -> Option<String> {
        let hit = self.node_at(screen_x, screen_y).map(str::to_owned);
        self.selected = hit.clone();

        if let Some(id) = &hit {
            log::debug!("clicked node {id}");
            if let Some(callback) = self.on_node_click.as_mut() {
                callback(id.as_str());
            }
        }
        hit
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn neighbors(&self, id: &str) -> Vec<&str> {
        self.graph.neighbors(id)
    }

    /// Ids within `radius` of a world point, closest first.
    pub fn nodes_near(&self, x: f32, y: f32, radius: f32) -> Vec<&str> {
        let mut found = self
            .hit_index
            .query_circle(x, y, radius)
            .into_iter()
            .map(|point| (point.distance_sq_to(x, y), point.id.as_str()))
            .collect::<Vec<_>>();
        found.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(b.1)));
        found.into_iter().map(|(_, id)| id).collect()
    }

    /// Ids whose display name fuzzy-matches `query`, best match first.
    pub fn search(&self, query: &str) -> Vec<&str> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        let matcher = SkimMatcherV2::default();
        let mut matches = self
            .positions
            .iter()
            .filter_map(|(id, position)| {
                fuzzy_score(&matcher, &position.name, query).map(|score| (score, id.as_str()))
            })
            .collect::<Vec<_>>();
        matches.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));
        matches.into_iter().map(|(_, id)| id).collect()
    }

    pub fn move_node(&mut self, id: &str, x: f32, y: f32) -> bool {
        if !self.simulation.set_position(id, x, y) {
            return false;
        }
        self.publish();
        true
    }
}
