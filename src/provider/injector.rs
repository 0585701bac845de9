//! Fills injection points and runs post-inject hooks.

use std::sync::Arc;

use tracing::warn;

use super::Container;
use crate::error::{DiError, DiResult};
use crate::lifetime::Lifetime;
use crate::metadata::{Fill, InjectionPoint, TypeMetadata};
use crate::registration::{Provider, Target};

fn member_error(metadata: &TypeMetadata, point: &InjectionPoint, source: DiError) -> DiError {
    DiError::InjectMember {
        service: metadata.type_name,
        member: point.member,
        source: Box::new(source),
    }
}

/// Injects `target` in declaration order, base members first.
///
/// `owner` is the provider that produced `target`, `None` for
/// `Container::inject_services`. Slots that are already filled are skipped.
pub(crate) fn inject(
    container: &Container,
    target: &Target,
    metadata: &TypeMetadata,
    owner: Option<&Provider>,
) -> DiResult<()> {
    for point in &metadata.points {
        if (point.is_filled)(target) {
            continue;
        }

        let provider = match container.lookup(&point.key) {
            Ok(provider) => provider,
            Err(err) if point.optional && err.is_not_found() => {
                warn!(
                    service = metadata.type_name,
                    member = point.member,
                    key = %point.key,
                    "optional dependency not registered, slot left empty"
                );
                continue;
            }
            Err(err) => return Err(member_error(metadata, point, err)),
        };

        match &point.fill {
            Fill::Factory(bind) => {
                bind(target, Arc::downgrade(&container.inner), point.key.clone())
                    .map_err(|err| member_error(metadata, point, err))?;
            }
            Fill::Value(fill) => {
                if let Some(owner) = owner {
                    if owner.lifetime() == Lifetime::Singleton && provider.lifetime() == Lifetime::Transient {
                        let err = DiError::WrongLifetime {
                            singleton: owner.name(),
                            transient: provider.name(),
                        };
                        return Err(member_error(metadata, point, err));
                    }
                }
                container
                    .instance_of(&provider)
                    .and_then(|raw| provider.project(raw, point.target))
                    .and_then(|value| fill(target, value))
                    .map_err(|err| member_error(metadata, point, err))?;
            }
        }
    }

    for hook in &metadata.hooks {
        (hook.run)(target).map_err(|source| DiError::Hook {
            service: metadata.type_name,
            hook: hook.name,
            source: Arc::from(source),
        })?;
    }
    Ok(())
}
