//! Turns `Describe` tables into pending providers.

use std::sync::Arc;

use tracing::{debug, trace};

use super::{Describe, Descriptor, Role};
use crate::collection::ContainerBuilder;
use crate::error::{DiError, DiResult};
use crate::key::TypeTag;
use crate::lifetime::Lifetime;
use crate::registration::{ctor, AnyArc, Creatable, Production, ProviderDef};

/// Scans `S`, by type when `instance` is `None`.
///
/// Type scans run at most once per builder; instance scans always register
/// the given value.
pub(crate) fn scan_type<S: Describe>(builder: &mut ContainerBuilder, instance: Option<S>) -> DiResult<()> {
    let tag = TypeTag::of::<S>();
    if instance.is_none() && builder.scanned.contains(&tag.id()) {
        trace!(type_name = tag.name(), "type already scanned");
        return Ok(());
    }

    let mut descriptor = Descriptor::<S>::new();
    S::describe(&mut descriptor);
    descriptor.check_roles(instance.is_some())?;
    let metadata = descriptor.metadata()?;

    let Descriptor {
        constructor,
        roles,
        members,
        scans,
        ..
    } = descriptor;

    let constructor = constructor.map(|typed| ctor(move |ctx| typed(ctx).map(|value| Arc::new(value) as AnyArc)));
    let creatable = constructor.as_ref().map(|constructor| Creatable {
        tag,
        ctor: constructor.clone(),
        metadata: metadata.clone(),
    });

    let production = match instance {
        Some(value) => Some(Production::Value(Arc::new(value))),
        None => constructor.map(Production::Factory),
    };

    let mut defs = Vec::new();
    if let Some(role) = roles.into_iter().next() {
        let production = production.ok_or_else(|| DiError::metadata(tag.name(), "no construction path"))?;
        let mut own = ProviderDef::new(tag, Lifetime::Singleton, production);
        if !metadata.is_empty() {
            own.metadata = Some(metadata);
        }
        match role {
            Role::Service(options) => {
                options.apply(&mut own)?;
                defs.push(own);
            }
            Role::Configuration => {
                defs.push(own);
                defs.extend(members);
            }
            Role::Factory(product) => {
                defs.push(own);
                defs.push(product);
            }
        }
    }

    // Only a type that passed validation counts as scanned.
    builder.scanned.insert(tag.id());
    if let Some(creatable) = creatable {
        builder.creatable.insert(tag.id(), creatable);
    }
    debug!(type_name = tag.name(), providers = defs.len(), "scanned type");
    builder.pending.extend(defs);

    for scan in scans {
        scan(builder)?;
    }
    Ok(())
}

pub(crate) fn scan_directive<U: Describe>(builder: &mut ContainerBuilder) -> DiResult<()> {
    scan_type::<U>(builder, None)
}
