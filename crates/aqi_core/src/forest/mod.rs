//! Random-forest inference
//!
//! - **Flat trees**: nodes live in one array per tree, children after parents
//! - **Mean aggregation**: the forest predicts the average tree output
//! - **Validated on load**: broken structure is rejected before serving
//!
//! # Usage
//!
//! ```rust
//! use aqi_core::forest::{ForestModel, Node, Tree};
//!
//! let tree = Tree::new(vec![
//!     Node::internal(0, 0, 50.0, 1, 2),
//!     Node::leaf(1, 40.0),
//!     Node::leaf(2, 160.0),
//! ]);
//! let model = ForestModel::new(1, vec![tree], vec![1.0]);
//!
//! assert_eq!(model.predict(&[30.0]).unwrap(), 40.0);
//! ```

pub mod model;
pub mod tree;

pub use model::{ForestModel, MODEL_FORMAT_VERSION};
pub use tree::{Node, Tree};

#[cfg(test)]
mod integration_tests {
    use super::*;
    use crate::errors::ModelError;

    fn two_tree_model() -> ForestModel {
        let tree1 = Tree::new(vec![
            Node::internal(0, 0, 50.0, 1, 2),
            Node::leaf(1, 100.0),
            Node::leaf(2, 200.0),
        ]);
        let tree2 = Tree::new(vec![
            Node::internal(0, 1, 30.0, 1, 2),
            Node::leaf(1, 50.0),
            Node::leaf(2, 150.0),
        ]);
        ForestModel::new(2, vec![tree1, tree2], vec![0.5, 0.5])
    }

    #[test]
    fn test_mean_of_trees() {
        let model = two_tree_model();
        // 100 and 50
        assert_eq!(model.predict(&[30.0, 20.0]).unwrap(), 75.0);
        // 200 and 150
        assert_eq!(model.predict(&[60.0, 40.0]).unwrap(), 175.0);
    }

    #[test]
    fn test_feature_count_mismatch() {
        let model = two_tree_model();
        assert_eq!(
            model.predict(&[1.0]),
            Err(ModelError::FeatureCountMismatch {
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn test_validation() {
        assert!(two_tree_model().validate().is_ok());

        let empty = ForestModel::new(2, vec![], vec![0.0, 0.0]);
        assert_eq!(empty.validate(), Err(ModelError::Empty));

        let mut bad = two_tree_model();
        bad.feature_importances = vec![1.0];
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_json_roundtrip_preserves_predictions() {
        let model = two_tree_model();
        let json = serde_json::to_string(&model).unwrap();
        let restored: ForestModel = serde_json::from_str(&json).unwrap();
        assert_eq!(model, restored);
        assert_eq!(
            model.predict(&[42.0, 17.0]).unwrap(),
            restored.predict(&[42.0, 17.0]).unwrap()
        );
    }
}
