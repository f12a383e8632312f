//! Variable names, units, and the well-known variable roles

// crate modules
use crate::error::{Error, Result};

// slftools modules
use slftools_format::{f, fixed_width, trim_field};

// external crates
use serde::{Deserialize, Serialize};

/// Byte length of a variable name record (16 name + 16 unit)
pub(crate) const VARIABLE_RECORD: usize = 32;

/// Byte length of each half of a variable name record
const FIELD: usize = 16;

/// A result variable as listed in the header
///
/// Each variable occupies a 32 byte text record with the first 16 characters
/// for the name and the last 16 for the unit.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Variable {
    /// Variable name, e.g. "VELOCITY U"
    pub name: String,
    /// Unit, e.g. "M/S"
    pub unit: String,
}

impl Variable {
    /// New variable from a name and unit
    pub fn new(name: &str, unit: &str) -> Self {
        Self {
            name: name.trim_end().to_string(),
            unit: unit.trim_end().to_string(),
        }
    }

    /// Split a raw 32 byte record into name and unit
    pub(crate) fn from_record(record: &[u8]) -> Self {
        let (name, unit) = record.split_at(FIELD.min(record.len()));
        Self {
            name: trim_field(name),
            unit: trim_field(unit),
        }
    }

    /// Raw 32 byte record for writing
    pub(crate) fn to_record(&self) -> Vec<u8> {
        let mut record = fixed_width(&self.name, FIELD);
        record.extend(fixed_width(&self.unit, FIELD));
        record
    }

    /// Case-insensitive substring match against the name
    pub fn matches(&self, pattern: &str) -> bool {
        self.name
            .to_uppercase()
            .contains(pattern.trim().to_uppercase().as_str())
    }
}

impl std::fmt::Display for Variable {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.unit)
    }
}

/// Canonical meaning of a variable, independent of language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Water depth (H)
    WaterDepth,
    /// Free surface elevation (S)
    FreeSurface,
    /// Bottom elevation, or the elevation of 3D planes (B, Z)
    Bottom,
    /// Velocity along x (U)
    VelocityU,
    /// Velocity along y (V)
    VelocityV,
    /// Vertical velocity (W)
    VelocityW,
}

/// Names recognised for each [Role], as `(role, french, english)`
///
/// A role may appear on several rows. The first variable in header order that
/// matches any row of a role is the one recorded for it.
pub const ROLE_NAMES: &[(Role, &str, &str)] = &[
    (Role::WaterDepth, "HAUTEUR D'EAU", "WATER DEPTH"),
    (Role::FreeSurface, "SURFACE LIBRE", "FREE SURFACE"),
    (Role::Bottom, "FOND", "BOTTOM"),
    (Role::Bottom, "COTE Z", "ELEVATION Z"),
    (Role::VelocityU, "VITESSE U", "VELOCITY U"),
    (Role::VelocityV, "VITESSE V", "VELOCITY V"),
    (Role::VelocityW, "VITESSE W", "VELOCITY W"),
];

/// Index of the first variable found for each [Role]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Roles {
    /// [Role::WaterDepth]
    pub water_depth: Option<usize>,
    /// [Role::FreeSurface]
    pub free_surface: Option<usize>,
    /// [Role::Bottom], including the plane elevation of 3D results
    pub bottom: Option<usize>,
    /// [Role::VelocityU]
    pub velocity_u: Option<usize>,
    /// [Role::VelocityV]
    pub velocity_v: Option<usize>,
    /// [Role::VelocityW]
    pub velocity_w: Option<usize>,
}

impl Roles {
    /// Scan the variables in order and record the first match of each role
    pub fn from_variables(variables: &[Variable]) -> Self {
        let mut roles = Self::default();
        for (i, variable) in variables.iter().enumerate() {
            for (role, french, english) in ROLE_NAMES {
                if variable.matches(french) || variable.matches(english) {
                    let slot = roles.slot(*role);
                    if slot.is_none() {
                        *slot = Some(i);
                    }
                }
            }
        }
        roles
    }

    /// Index of the variable for `role`, if there is one
    pub fn get(&self, role: Role) -> Option<usize> {
        match role {
            Role::WaterDepth => self.water_depth,
            Role::FreeSurface => self.free_surface,
            Role::Bottom => self.bottom,
            Role::VelocityU => self.velocity_u,
            Role::VelocityV => self.velocity_v,
            Role::VelocityW => self.velocity_w,
        }
    }

    fn slot(&mut self, role: Role) -> &mut Option<usize> {
        match role {
            Role::WaterDepth => &mut self.water_depth,
            Role::FreeSurface => &mut self.free_surface,
            Role::Bottom => &mut self.bottom,
            Role::VelocityU => &mut self.velocity_u,
            Role::VelocityV => &mut self.velocity_v,
            Role::VelocityW => &mut self.velocity_w,
        }
    }
}

/// Either a variable id or a name to match
///
/// Names are matched case-insensitively as substrings of the variable name,
/// so `"velocity u"` finds `"VELOCITY U"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableSelector {
    /// Position in the header
    Id(usize),
    /// Name, or part of a name
    Name(String),
}

impl From<usize> for VariableSelector {
    fn from(id: usize) -> Self {
        Self::Id(id)
    }
}

impl From<&str> for VariableSelector {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for VariableSelector {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

/// Resolve a selector against a variable list
pub(crate) fn resolve(variables: &[Variable], selector: &VariableSelector) -> Result<usize> {
    match selector {
        VariableSelector::Id(id) if *id < variables.len() => Ok(*id),
        VariableSelector::Id(id) => Err(Error::VariableIdOutOfRange {
            id: *id,
            count: variables.len(),
        }),
        VariableSelector::Name(name) => variables
            .iter()
            .position(|v| v.matches(name))
            .ok_or_else(|| Error::VariableNotFound(f!("{name}"))),
    }
}

/// First candidate name that resolves, tried in order
pub(crate) fn first_of(variables: &[Variable], candidates: &[&str]) -> Option<usize> {
    candidates
        .iter()
        .find_map(|name| variables.iter().position(|v| v.matches(name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variables() -> Vec<Variable> {
        vec![
            Variable::new("VELOCITY U", "M/S"),
            Variable::new("VELOCITY V", "M/S"),
            Variable::new("HAUTEUR D'EAU", "M"),
            Variable::new("FOND", "M"),
            Variable::new("BOTTOM", "M"),
        ]
    }

    #[test]
    fn record_split() {
        let record = b"VITESSE U       M/S             ";
        let variable = Variable::from_record(record);
        assert_eq!(variable.name, "VITESSE U");
        assert_eq!(variable.unit, "M/S");
        assert_eq!(variable.to_record(), record.to_vec());
    }

    #[test]
    fn roles_in_both_languages() {
        let roles = Roles::from_variables(&variables());
        assert_eq!(roles.velocity_u, Some(0));
        assert_eq!(roles.velocity_v, Some(1));
        assert_eq!(roles.water_depth, Some(2));
        // first match wins
        assert_eq!(roles.bottom, Some(3));
        assert_eq!(roles.get(Role::FreeSurface), None);
    }

    #[test]
    fn selectors() {
        let variables = variables();
        assert_eq!(resolve(&variables, &"velocity v".into()).unwrap(), 1);
        assert_eq!(resolve(&variables, &VariableSelector::Id(4)).unwrap(), 4);
        assert!(matches!(
            resolve(&variables, &VariableSelector::Id(5)),
            Err(Error::VariableIdOutOfRange { id: 5, count: 5 })
        ));
        assert!(matches!(
            resolve(&variables, &"salinity".into()),
            Err(Error::VariableNotFound(_))
        ));
    }

    #[test]
    fn ordered_candidates() {
        let variables = variables();
        assert_eq!(first_of(&variables, &["ELEVATION Z", "FOND"]), Some(3));
        assert_eq!(first_of(&variables, &["SALINITY", "TRACER"]), None);
    }
}
