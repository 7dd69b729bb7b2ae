//! Mount and reconciliation driver.
//!
//! The change-tracking primitive and the diff/patch display library are
//! external collaborators, modeled as the `Reactor` and `DisplayBackend`
//! traits. `Runtime::mount` wraps one tick (full root render plus
//! reconciliation) in the reactor's autorun so the tick re-executes
//! whenever a value it read changes. Ticks run serially to completion;
//! a failed tick propagates its error to the embedder and is not retried.

use crate::component::{render_instance, InstanceRef};
use crate::error::{
    Result, WeftError, ERR_MOUNT_NON_ROOT, ERR_MOUNT_NO_TARGET, ERR_MOUNT_TWICE,
};
use crate::vdom::VNode;
use std::any::Any;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Opaque reference to a live display node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle(pub u64);

/// Opaque patch set produced by `DisplayBackend::diff`; only the backend
/// that produced it can interpret it.
pub struct PatchSet(Box<dyn Any>);

impl PatchSet {
    pub fn new<T: 'static>(payload: T) -> PatchSet {
        PatchSet(Box::new(payload))
    }

    pub fn downcast<T: 'static>(self) -> Option<T> {
        self.0.downcast::<T>().ok().map(|payload| *payload)
    }
}

/// The external diff/patch and display mutation primitives.
pub trait DisplayBackend {
    fn locate(&mut self, selector: &str) -> Option<NodeHandle>;
    fn create(&mut self, tree: &VNode) -> NodeHandle;
    fn append_child(&mut self, parent: NodeHandle, child: NodeHandle);
    fn diff(&mut self, old: &VNode, new: &VNode) -> PatchSet;
    fn apply(&mut self, handle: NodeHandle, patches: PatchSet) -> NodeHandle;
}

/// The external change-notification primitive. `autorun` runs the effect
/// once immediately and re-invokes it synchronously whenever a value read
/// during the previous invocation changes.
pub trait Reactor {
    fn autorun(&mut self, effect: Box<dyn FnMut() -> Result<()>>);
}

pub struct Runtime {
    display: Rc<RefCell<dyn DisplayBackend>>,
    reactor: Rc<RefCell<dyn Reactor>>,
}

impl Runtime {
    pub fn new(
        display: Rc<RefCell<dyn DisplayBackend>>,
        reactor: Rc<RefCell<dyn Reactor>>,
    ) -> Runtime {
        Runtime { display, reactor }
    }

    /// Mount a root instance under the display node named by `selector`.
    pub fn mount(&self, root: &InstanceRef, selector: &str) -> Result<()> {
        {
            let inst = root.borrow();
            if !inst.is_root() {
                return Err(WeftError::new(
                    ERR_MOUNT_NON_ROOT,
                    format!("Mounting child component `{}` is disallowed", inst.id),
                ));
            }
            if inst.mounted {
                return Err(WeftError::new(
                    ERR_MOUNT_TWICE,
                    format!("Component `{}` is already mounted", inst.id),
                ));
            }
        }

        let target = self
            .display
            .borrow_mut()
            .locate(selector)
            .ok_or_else(|| {
                WeftError::new(
                    ERR_MOUNT_NO_TARGET,
                    format!("Cannot find display element: {}", selector),
                )
            })?;
        root.borrow_mut().mounted = true;

        let display = Rc::clone(&self.display);
        let instance = Rc::clone(root);
        self.reactor
            .borrow_mut()
            .autorun(Box::new(move || tick(&display, &instance, target)));
        Ok(())
    }
}

/// One render-and-reconcile cycle. The first tick materializes a display
/// node and appends it under the target; later ticks diff against the
/// previous virtual tree and patch the existing node in place.
fn tick(
    display: &Rc<RefCell<dyn DisplayBackend>>,
    instance: &InstanceRef,
    target: NodeHandle,
) -> Result<()> {
    let previous: Option<VNode> = instance.borrow().last_tree.clone();
    let next = render_instance(
        instance,
        BTreeMap::new(),
        BTreeMap::new(),
        BTreeMap::new(),
    )?;

    match previous {
        None => {
            let mut backend = display.borrow_mut();
            let handle = backend.create(&next);
            backend.append_child(target, handle);
            drop(backend);
            instance.borrow_mut().handle = Some(handle);
        }
        Some(previous) => {
            let handle = instance.borrow().handle;
            if let Some(handle) = handle {
                let patches = display.borrow_mut().diff(&previous, &next);
                let patched = display.borrow_mut().apply(handle, patches);
                instance.borrow_mut().handle = Some(patched);
            }
        }
    }
    Ok(())
}
