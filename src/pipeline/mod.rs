//! Pass recipes registered at startup.
//!
//! A [`PassRecipe`] knows how to declare one pass (or a small group of passes)
//! into a frame. Recipes are registered once into a [`PassRegistry`] and
//! replayed every frame in registration order, so the set of passes a
//! renderer knows about is explicit and fixed at startup.
//!
//! # Example
//!
//! ```ignore
//! struct DepthPrepass;
//!
//! impl PassRecipe<CommandList> for DepthPrepass {
//!     fn name(&self) -> &str {
//!         "depth_prepass"
//!     }
//!
//!     fn declare(&self, frame: &mut FrameBuilder<CommandList>, settings: &FrameSettings) -> Result<()> {
//!         let depth = frame.declare_texture_relative("depth", TextureSize::default(), TextureFormat::Depth32Float, usage)?;
//!         let mut pass = frame.add_pass("depth_prepass", PassConfig::graphics(), ())?;
//!         pass.write_depth(depth, DepthAccess::Write)?;
//!         pass.set_execute_callback(|_, resources, ctx| Ok(()));
//!         Ok(())
//!     }
//! }
//!
//! let mut registry = PassRegistry::new();
//! registry.register(DepthPrepass)?;
//! ```

use crate::error::{GraphError, Result};
use crate::frame::FrameSettings;
use crate::graph::FrameBuilder;

/// Declares passes into a frame.
pub trait PassRecipe<R> {
    /// Unique name of the recipe.
    fn name(&self) -> &str;

    /// Declare this recipe's resources and passes.
    fn declare(&self, frame: &mut FrameBuilder<R>, settings: &FrameSettings) -> Result<()>;
}

/// Ordered set of pass recipes.
pub struct PassRegistry<R> {
    recipes: Vec<Box<dyn PassRecipe<R>>>,
}

impl<R> Default for PassRegistry<R> {
    fn default() -> Self {
        Self {
            recipes: Vec::new(),
        }
    }
}

impl<R> PassRegistry<R> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a recipe.
    ///
    /// # Errors
    ///
    /// [`GraphError::DuplicatePass`] if a recipe with the same name exists.
    pub fn register(&mut self, recipe: impl PassRecipe<R> + 'static) -> Result<()> {
        if self.contains(recipe.name()) {
            return Err(GraphError::DuplicatePass(recipe.name().to_string()));
        }
        log::debug!("registered pass recipe '{}'", recipe.name());
        self.recipes.push(Box::new(recipe));
        Ok(())
    }

    /// Check if a recipe with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.recipes.iter().any(|recipe| recipe.name() == name)
    }

    /// Recipe names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.recipes.iter().map(|recipe| recipe.name())
    }

    /// Number of registered recipes.
    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    /// Check if no recipes are registered.
    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    /// Declare every recipe into `frame`, in registration order.
    ///
    /// Stops at the first recipe that fails.
    pub fn record_frame(
        &self,
        frame: &mut FrameBuilder<R>,
        settings: &FrameSettings,
    ) -> Result<()> {
        for recipe in &self.recipes {
            log::trace!("recording pass recipe '{}'", recipe.name());
            recipe.declare(frame, settings)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::FrameGraph;
    use crate::GraphConfig;

    struct Named(&'static str);

    impl PassRecipe<()> for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn declare(&self, frame: &mut FrameBuilder<()>, _settings: &FrameSettings) -> Result<()> {
            frame.add_pass(self.0, Default::default(), ())?;
            Ok(())
        }
    }

    struct Failing;

    impl PassRecipe<()> for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn declare(&self, frame: &mut FrameBuilder<()>, _settings: &FrameSettings) -> Result<()> {
            frame.add_dependency(crate::graph::PassId::new(99), crate::graph::PassId::new(0))
        }
    }

    #[test]
    fn test_register_and_names() {
        let mut registry = PassRegistry::new();
        assert!(registry.is_empty());
        registry.register(Named("shadows")).unwrap();
        registry.register(Named("forward")).unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry.contains("forward"));
        assert!(!registry.contains("bloom"));
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["shadows", "forward"]);
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut registry = PassRegistry::new();
        registry.register(Named("forward")).unwrap();
        assert_eq!(
            registry.register(Named("forward")).unwrap_err(),
            GraphError::DuplicatePass("forward".into())
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_record_frame_in_order() {
        let mut registry = PassRegistry::new();
        registry.register(Named("shadows")).unwrap();
        registry.register(Named("forward")).unwrap();

        let graph = FrameGraph::new(GraphConfig::default());
        let mut frame = graph.begin_frame();
        registry
            .record_frame(&mut frame, &FrameSettings::default())
            .unwrap();

        let names: Vec<_> = frame.passes().iter().map(|pass| pass.name()).collect();
        assert_eq!(names, vec!["shadows", "forward"]);
    }

    #[test]
    fn test_record_frame_stops_on_error() {
        let mut registry = PassRegistry::new();
        registry.register(Failing).unwrap();
        registry.register(Named("never")).unwrap();

        let graph = FrameGraph::new(GraphConfig::default());
        let mut frame = graph.begin_frame();
        assert!(registry
            .record_frame(&mut frame, &FrameSettings::default())
            .is_err());
        assert!(frame.passes().is_empty());
    }
}
