/// Vegetation sprite transitions.
///
/// Each vegetation object carries a three-state machine. Hysteresis around
/// the switch distance keeps an object that sits on the threshold from
/// flickering; a switch cross-fades over `sprite_transition_frames` frames.

use glam::Vec3;
use crate::config::TreeConfig;
use crate::object::ObjectCategory;
use crate::tree::{NodeKey, SpatialTree};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpriteState {
    #[default]
    Show3D,
    ShowSprite,
    /// `frame` counts frames already spent fading toward the target
    Transitioning { to_sprite: bool, frame: u8 },
}

impl SpriteState {
    /// Representation the object is heading to.
    pub fn wants_sprite(self) -> bool {
        match self {
            SpriteState::Show3D => false,
            SpriteState::ShowSprite => true,
            SpriteState::Transitioning { to_sprite, .. } => to_sprite,
        }
    }

    pub fn is_transitioning(self) -> bool {
        matches!(self, SpriteState::Transitioning { .. })
    }

    fn settled(to_sprite: bool) -> Self {
        if to_sprite {
            SpriteState::ShowSprite
        } else {
            SpriteState::Show3D
        }
    }
}

/// Half width of the no-switch band around `switch_distance`.
pub fn hysteresis_band(switch_distance: f32, config: &TreeConfig) -> f32 {
    (switch_distance * config.sprite_dissolve_dist_ratio).min(config.sprite_dissolve_min_dist)
}

/// Advance one object's state by one frame.
pub fn advance_sprite_state(state: SpriteState, distance: f32, switch_distance: f32, config: &TreeConfig) -> SpriteState {
    let band = hysteresis_band(switch_distance, config);
    let wants_sprite = if distance > switch_distance + band {
        true
    } else if distance < switch_distance - band {
        false
    } else {
        state.wants_sprite()
    };
    let frames = config.sprite_transition_frames.max(1);

    match state {
        SpriteState::Show3D | SpriteState::ShowSprite => {
            if wants_sprite == state.wants_sprite() {
                state
            } else {
                SpriteState::Transitioning { to_sprite: wants_sprite, frame: 0 }
            }
        }
        SpriteState::Transitioning { to_sprite, frame } if to_sprite == wants_sprite => {
            let next = frame.saturating_add(1);
            if next >= frames {
                SpriteState::settled(to_sprite)
            } else {
                SpriteState::Transitioning { to_sprite, frame: next }
            }
        }
        SpriteState::Transitioning { frame, .. } => {
            // Reverse from the current blend instead of restarting
            let frame = frames.saturating_sub(frame);
            if frame >= frames {
                SpriteState::settled(wants_sprite)
            } else {
                SpriteState::Transitioning { to_sprite: wants_sprite, frame }
            }
        }
    }
}

impl SpatialTree {
    /// Advance the sprite state of a node's vegetation, at most once per
    /// frame. Returns the number of objects whose state changed.
    pub(crate) fn update_node_sprites(&mut self, node_key: NodeKey, eye: Vec3, zoom: f32, frame_id: u32) -> usize {
        if !self.config.sprites_enabled {
            return 0;
        }
        let Some(node) = self.nodes.get_mut(node_key) else { return 0 };
        if node.sprite_frame == Some(frame_id) {
            return 0;
        }
        node.sprite_frame = Some(frame_id);
        let list = node.lists[ObjectCategory::Vegetation.index()];

        let config = &self.config;
        let mut changed = 0;
        for key in list.keys(&self.objects) {
            let Some(slot) = self.objects.get_mut(key) else { continue };
            let Some(switch_distance) = slot.object.sprite_switch_distance() else { continue };
            let distance = slot.bbox.distance_to_point(eye) * zoom;
            let next = advance_sprite_state(slot.sprite, distance, switch_distance, config);
            if next != slot.sprite {
                slot.sprite = next;
                changed += 1;
            }
        }
        changed
    }
}

#[cfg(test)]
#[path = "sprite_tests.rs"]
mod tests;
