use std::sync::Arc;

use super::named;
use crate::{
    composite::{
        ConfigurationError, Validator,
        primitives::{expose_dependency, with_reverse_reference_list},
    },
    thing::{ThingKind, Update},
};

pub(super) fn kind() -> Result<Arc<ThingKind>, ConfigurationError> {
    named("Group", "group")
        .wiki_data("albumData")
        .field("color", Update::new(Validator::Color))
        .computed("albums", |c| {
            c.step(with_reverse_reference_list("albumData", "groups"))
                .step(expose_dependency("#reverseReferenceList"))
        })
        .build()
}

#[cfg(test)]
mod tests {
    use super::super::tests::{Fixture, refs};
    use crate::composite::Value;

    #[test]
    fn test_albums_in_data_order() {
        let mut fx = Fixture::new();
        let group = fx.group("official");
        let first = fx.album("first");
        let fan = fx.album("fan");
        let second = fx.album("second");
        first.set("groups", refs(&["group:official"])).unwrap();
        second.set("groups", refs(&["official", "group:other"])).unwrap();
        fan.set("groups", refs(&["group:fandom"])).unwrap();
        fx.link();

        assert_eq!(group.get("albums").unwrap(), Value::list([first, second].map(Value::Thing)));
    }
}
