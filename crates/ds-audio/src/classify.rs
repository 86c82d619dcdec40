use ds_core::config::SceneThresholds;
use ds_core::frame::{Classification, Scene};

/// Classifieur de scène à seuils fixes.
///
/// Rules are evaluated in priority order:
/// 1. `rms < quiet_rms` → Quiet
/// 2. `rms <= noise_rms` and `centroid_min <= centroid <= centroid_max` → Speech
/// 3. otherwise → Noise
///
/// The strict `<` on the quiet edge and the inclusive speech band are
/// intentional: a block sitting exactly on a boundary resolves toward Speech.
///
/// # Example
/// ```
/// use ds_audio::classify::SceneClassifier;
/// use ds_core::frame::Scene;
///
/// let classifier = SceneClassifier::default();
/// assert_eq!(classifier.classify(0.05, 1500.0).scene, Scene::Speech);
/// assert_eq!(classifier.classify(0.05, 5000.0).scene, Scene::Noise);
/// ```
#[derive(Clone, Debug, Default)]
pub struct SceneClassifier {
    thresholds: SceneThresholds,
}

impl SceneClassifier {
    /// Build a classifier from validated thresholds.
    #[must_use]
    pub fn new(thresholds: SceneThresholds) -> Self {
        Self { thresholds }
    }

    /// Map (RMS, centroid) to a scene and its gain.
    #[must_use]
    pub fn classify(&self, rms: f32, centroid: f32) -> Classification {
        let scene = self.scene_for(rms, centroid);
        Classification {
            scene,
            gain: self.gain_for(scene),
        }
    }

    /// Scene label alone.
    #[must_use]
    pub fn scene_for(&self, rms: f32, centroid: f32) -> Scene {
        let t = &self.thresholds;
        if rms < t.quiet_rms {
            Scene::Quiet
        } else if rms <= t.noise_rms && (t.centroid_min..=t.centroid_max).contains(&centroid) {
            Scene::Speech
        } else {
            Scene::Noise
        }
    }

    /// Gain associated with `scene`.
    #[must_use]
    pub fn gain_for(&self, scene: Scene) -> f32 {
        match scene {
            Scene::Quiet => self.thresholds.quiet_gain,
            Scene::Speech => self.thresholds.speech_gain,
            Scene::Noise => self.thresholds.noise_gain,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_wins_regardless_of_centroid() {
        let c = SceneClassifier::default();
        for centroid in [0.0, 1500.0, 5000.0, f32::NAN] {
            let result = c.classify(0.01, centroid);
            assert_eq!(result.scene, Scene::Quiet);
            assert_eq!(result.gain, 3.0);
        }
    }

    #[test]
    fn speech_needs_in_band_centroid() {
        let c = SceneClassifier::default();
        let speech = c.classify(0.05, 1500.0);
        assert_eq!(speech.scene, Scene::Speech);
        assert_eq!(speech.gain, 1.0);

        let noise = c.classify(0.05, 5000.0);
        assert_eq!(noise.scene, Scene::Noise);
        assert_eq!(noise.gain, 0.5);
    }

    #[test]
    fn loud_block_is_noise_even_in_band() {
        let c = SceneClassifier::default();
        assert_eq!(c.classify(0.20, 1500.0).scene, Scene::Noise);
    }

    #[test]
    fn boundaries_follow_comparison_operators() {
        let c = SceneClassifier::default();
        // rms == quiet_rms is not Quiet
        assert_eq!(c.classify(0.025, 1000.0).scene, Scene::Speech);
        // rms == noise_rms is still Speech
        assert_eq!(c.classify(0.10, 1000.0).scene, Scene::Speech);
        // band edges are inclusive
        assert_eq!(c.classify(0.05, 600.0).scene, Scene::Speech);
        assert_eq!(c.classify(0.05, 3200.0).scene, Scene::Speech);
        assert_eq!(c.classify(0.05, 599.9).scene, Scene::Noise);
        assert_eq!(c.classify(0.05, 3200.1).scene, Scene::Noise);
    }

    #[test]
    fn custom_thresholds_are_honoured() {
        let c = SceneClassifier::new(SceneThresholds {
            quiet_rms: 0.5,
            noise_gain: 0.25,
            ..SceneThresholds::default()
        });
        assert_eq!(c.classify(0.2, 1500.0).scene, Scene::Quiet);
        assert_eq!(c.classify(0.6, 1500.0).gain, 0.25);
        assert_eq!(c.gain_for(Scene::Speech), 1.0);
    }

    #[test]
    fn classification_gain_matches_scene_gain() {
        let c = SceneClassifier::new(SceneThresholds {
            quiet_gain: 4.0,
            speech_gain: 1.5,
            noise_gain: 0.1,
            ..SceneThresholds::default()
        });
        for (rms, centroid) in [(0.01, 1000.0), (0.05, 1000.0), (0.05, 8000.0), (0.5, 1000.0)] {
            let result = c.classify(rms, centroid);
            assert_eq!(result.scene, c.scene_for(rms, centroid));
            assert_eq!(result.gain, c.gain_for(result.scene), "rms={rms} centroid={centroid}");
        }
        assert_eq!(c.classify(0.01, 1000.0).gain, 4.0);
        assert_eq!(c.classify(0.5, 1000.0).gain, 0.1);
    }
}
