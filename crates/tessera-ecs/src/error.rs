/// Errors returned by fallible registry and storage operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EcsError {
    #[error(
        "entity {entity} needs a sparse capacity of {required} for '{component}', \
         but the maximum is {max}"
    )]
    CapacityExceeded {
        entity: u64,
        required: u64,
        max: usize,
        component: &'static str,
    },
}
