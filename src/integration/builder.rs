//! Builder for creating Detection objects from various input formats.

use crate::tracker::{Detection, Embedding, Rect};

/// Builder for creating `Detection` objects from various input formats.
#[derive(Debug, Clone, Default)]
pub struct DetectionBuilder {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    label: String,
    score: f32,
    embedding: Option<Embedding>,
}

impl DetectionBuilder {
    /// Create a new detection builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set bounding box in TLBR format (x1, y1, x2, y2).
    pub fn tlbr(mut self, x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        self.x1 = x1;
        self.y1 = y1;
        self.x2 = x2;
        self.y2 = y2;
        self
    }

    /// Set bounding box in XYWH format (center_x, center_y, width, height).
    pub fn xywh(mut self, cx: f32, cy: f32, w: f32, h: f32) -> Self {
        self.x1 = cx - w / 2.0;
        self.y1 = cy - h / 2.0;
        self.x2 = cx + w / 2.0;
        self.y2 = cy + h / 2.0;
        self
    }

    /// Set bounding box in TLWH format (left, top, width, height).
    pub fn tlwh(mut self, x: f32, y: f32, w: f32, h: f32) -> Self {
        self.x1 = x;
        self.y1 = y;
        self.x2 = x + w;
        self.y2 = y + h;
        self
    }

    /// Set the class label.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Set the confidence score.
    pub fn score(mut self, score: f32) -> Self {
        self.score = score;
        self
    }

    /// Attach a precomputed appearance descriptor. Zero or non-finite vectors are
    /// treated as "no embedding".
    pub fn embedding(mut self, values: Vec<f32>) -> Self {
        self.embedding = Embedding::new(values);
        self
    }

    /// Build the final `Detection`.
    pub fn build(self) -> Detection {
        Detection {
            bbox: Rect::from_tlbr(self.x1, self.y1, self.x2, self.y2),
            label: self.label,
            score: self.score,
            embedding: self.embedding,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_builder() {
        let det = DetectionBuilder::new()
            .tlbr(10.0, 20.0, 50.0, 80.0)
            .label("cup")
            .score(0.95)
            .build();

        assert_eq!(det.score, 0.95);
        assert_eq!(det.label, "cup");
        assert_eq!(det.bbox, Rect::new(10.0, 20.0, 40.0, 60.0));
    }

    #[test]
    fn test_center_format() {
        let det = DetectionBuilder::new().xywh(30.0, 30.0, 10.0, 20.0).build();
        assert_eq!(det.bbox.center(), (30.0, 30.0));
        let same = DetectionBuilder::new().tlwh(25.0, 20.0, 10.0, 20.0).build();
        assert_eq!(det.bbox.to_tlwh(), same.bbox.to_tlwh());
    }

    #[test]
    fn test_zero_embedding_is_dropped() {
        let det = DetectionBuilder::new().embedding(vec![0.0; 4]).build();
        assert!(det.embedding.is_none());

        let det = DetectionBuilder::new().embedding(vec![2.0, 0.0]).build();
        assert_eq!(det.embedding.unwrap().as_array().to_vec(), vec![1.0, 0.0]);
    }
}
