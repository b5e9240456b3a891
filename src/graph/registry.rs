//! Logical resource registry.
//!
//! The registry owns the descriptors of every resource declared in a frame.
//! Declaring a transient resource only records its descriptor; backing storage
//! is acquired by the scheduler right before the first pass that uses it.

use std::collections::HashMap;

use crate::error::{GraphError, Result};
use crate::types::{BufferDescriptor, ResourceDescriptor, ResourceKind, TextureDescriptor};

use super::resource::{ExternalResource, ResourceHandle, ResourceOrigin, VirtualResource};
use super::PassId;

/// Tracks the logical resources of a single frame.
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    resources: Vec<VirtualResource>,
    /// Imported resources by name.
    imported: HashMap<String, ResourceHandle>,
}

impl ResourceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a transient resource owned by the graph.
    pub fn declare(
        &mut self,
        name: impl Into<String>,
        desc: impl Into<ResourceDescriptor>,
    ) -> Result<ResourceHandle> {
        self.insert(name.into(), desc.into(), ResourceOrigin::Transient, None)
    }

    /// Declare a transient texture.
    pub fn declare_texture(
        &mut self,
        name: impl Into<String>,
        desc: TextureDescriptor,
    ) -> Result<ResourceHandle> {
        self.declare(name, desc)
    }

    /// Declare a transient buffer.
    pub fn declare_buffer(
        &mut self,
        name: impl Into<String>,
        desc: BufferDescriptor,
    ) -> Result<ResourceHandle> {
        self.declare(name, desc)
    }

    /// Import a resource whose lifetime is owned by the caller.
    ///
    /// Importing the same name twice returns a new handle and makes the name
    /// resolve to the most recent import.
    pub fn import(
        &mut self,
        name: impl Into<String>,
        external: ExternalResource,
        desc: impl Into<ResourceDescriptor>,
    ) -> Result<ResourceHandle> {
        let name = name.into();
        let handle = self.insert(
            name.clone(),
            desc.into(),
            ResourceOrigin::Imported(external),
            None,
        )?;
        self.imported.insert(name, handle);
        Ok(handle)
    }

    /// Import a caller-owned texture.
    pub fn import_texture(
        &mut self,
        name: impl Into<String>,
        external: ExternalResource,
        desc: TextureDescriptor,
    ) -> Result<ResourceHandle> {
        self.import(name, external, desc)
    }

    /// Import a caller-owned buffer.
    pub fn import_buffer(
        &mut self,
        name: impl Into<String>,
        external: ExternalResource,
        desc: BufferDescriptor,
    ) -> Result<ResourceHandle> {
        self.import(name, external, desc)
    }

    pub(crate) fn declare_for_pass(
        &mut self,
        name: String,
        desc: ResourceDescriptor,
        creator: PassId,
    ) -> Result<ResourceHandle> {
        self.insert(name, desc, ResourceOrigin::Transient, Some(creator))
    }

    fn insert(
        &mut self,
        name: String,
        desc: ResourceDescriptor,
        origin: ResourceOrigin,
        creator: Option<PassId>,
    ) -> Result<ResourceHandle> {
        if let Err(reason) = desc.validate() {
            return Err(GraphError::InvalidDescriptor { name, reason });
        }

        let handle = ResourceHandle::new(self.resources.len() as u32, desc.kind());
        log::trace!("declared {:?} '{}' as {:?}", desc.kind(), name, origin);
        self.resources.push(VirtualResource {
            handle,
            name,
            desc,
            origin,
            creator,
        });
        Ok(handle)
    }

    /// Look up an imported resource by name.
    pub fn imported(&self, name: &str) -> Option<ResourceHandle> {
        self.imported.get(name).copied()
    }

    /// Get a resource by handle.
    pub fn get(&self, handle: ResourceHandle) -> Option<&VirtualResource> {
        self.resources
            .get(handle.index())
            .filter(|resource| resource.handle == handle)
    }

    /// Get a resource by handle, failing with [`GraphError::UnknownResource`].
    pub fn resolve(&self, handle: ResourceHandle) -> Result<&VirtualResource> {
        self.get(handle).ok_or(GraphError::UnknownResource(handle))
    }

    /// Get a resource and check it is of the expected kind.
    pub(crate) fn resolve_kind(
        &self,
        handle: ResourceHandle,
        expected: ResourceKind,
    ) -> Result<&VirtualResource> {
        let resource = self.resolve(handle)?;
        if resource.desc.kind() != expected {
            return Err(GraphError::ResourceKindMismatch {
                name: resource.name.clone(),
                expected,
                actual: resource.desc.kind(),
            });
        }
        Ok(resource)
    }

    /// Get the descriptor of a resource.
    pub fn descriptor(&self, handle: ResourceHandle) -> Option<&ResourceDescriptor> {
        self.get(handle).map(|resource| &resource.desc)
    }

    /// Get the name of a resource, or `"<unknown>"`.
    pub fn name(&self, handle: ResourceHandle) -> &str {
        self.get(handle).map_or("<unknown>", |resource| &resource.name)
    }

    /// Number of declared resources.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Check if no resources were declared.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Iterate over all resources in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &VirtualResource> {
        self.resources.iter()
    }
}
