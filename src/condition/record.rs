//! This module contains the serializable form of a path condition, as handed
//! to persistence and reporting layers.

use serde::{Deserialize, Serialize};

use crate::{
    condition::{PathCondition, SubCondition},
    data::{Address, AssignmentMap, Value},
    trace::PathCode,
};

/// One `address = value` binding of an assignment.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Binding {
    pub address: Address,
    pub value:   Value,
}

/// The record of one sub-condition.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SubConditionRecord {
    /// The addresses of the branches that contributed to the sub-condition, in
    /// order.
    pub branches: Vec<Address>,

    /// The addresses that the sub-condition constrains.
    pub domain: Vec<Address>,

    /// The alternative assignments, each listing its bindings in address
    /// order.
    pub assignments: Vec<Vec<Binding>>,
}

impl From<&SubCondition> for SubConditionRecord {
    fn from(value: &SubCondition) -> Self {
        let branches = value.branches().iter().map(|b| b.address()).collect();
        let domain = value.domain().into_iter().collect();
        let assignments = value.assignments().iter().map(bindings_of).collect();
        Self {
            branches,
            domain,
            assignments,
        }
    }
}

/// The record of the stabilized condition of one execution path.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PathConditionRecord {
    /// The path code, rendered as a string of `0`s and `1`s.
    pub code: String,

    /// One record for every independent sub-condition.
    pub sub_conditions: Vec<SubConditionRecord>,
}

impl PathCondition {
    /// Builds the record of this condition for the path with `code`.
    #[must_use]
    pub fn record(&self, code: &PathCode) -> PathConditionRecord {
        let code = code.to_string();
        let sub_conditions = self.iter().map(SubConditionRecord::from).collect();
        PathConditionRecord {
            code,
            sub_conditions,
        }
    }
}

fn bindings_of(map: &AssignmentMap) -> Vec<Binding> {
    map.iter()
        .map(|(address, value)| Binding {
            address: *address,
            value:   value.clone(),
        })
        .collect()
}

#[cfg(test)]
mod test {
    use crate::{
        condition::{test::util, PathCondition, SubCondition},
        data::{Address, Value},
        trace::PathCode,
    };

    #[test]
    fn records_list_branches_domain_and_bindings() -> anyhow::Result<()> {
        let assignments = util::set(&[&[(0x20, 1), (0x10, 2)], &[(0x20, 3), (0x10, 4)]]);
        let sub = SubCondition::new(assignments, vec![util::branch(0x400), util::branch(0x410)]);
        let condition = PathCondition::from(vec![sub]);
        let code: PathCode = "01".parse()?;

        let record = condition.record(&code);

        assert_eq!(record.code, "01");
        assert_eq!(record.sub_conditions.len(), 1);
        let sub_record = &record.sub_conditions[0];
        assert_eq!(sub_record.branches, vec![Address::new(0x400), Address::new(0x410)]);
        assert_eq!(sub_record.domain, vec![Address::new(0x10), Address::new(0x20)]);
        assert_eq!(sub_record.assignments.len(), 2);
        assert_eq!(sub_record.assignments[0][0].address, Address::new(0x10));
        assert_eq!(sub_record.assignments[0][0].value, Value::from(2_u8));

        Ok(())
    }
}
