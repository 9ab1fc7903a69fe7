//! Typed node components
//!
//! On the wire a component is `{"type": "...", "properties": [{"key","value"}]}`
//! with every value a string. Records are decoded once, at parse time, into
//! [`ComponentSpec`]; types this version does not know are kept verbatim in
//! [`ComponentSpec::Unknown`] and written back unchanged.
//!
//! Field decoding never fails: a missing or unparsable value becomes zero or
//! `false` for that field only.

use serde::{Deserialize, Serialize};

use crate::document::Vec3;

// ============================================================================
// Wire representation
// ============================================================================

/// One key/value pair of a property bag
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub key: String,
    pub value: String,
}

/// Component as stored in documents
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawComponent {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub properties: Vec<Property>,
}

impl RawComponent {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            properties: Vec::new(),
        }
    }

    /// First value stored under `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|p| p.key == key)
            .map(|p| p.value.as_str())
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.push(Property {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn float(&self, key: &str) -> f32 {
        self.get(key).map(parse_float).unwrap_or_default()
    }

    pub fn int(&self, key: &str) -> i32 {
        self.get(key).map(parse_int).unwrap_or_default()
    }

    pub fn bool(&self, key: &str) -> bool {
        self.get(key).map(parse_bool).unwrap_or_default()
    }

    pub fn vec3(&self, key: &str) -> Vec3 {
        self.get(key).map(parse_vec3).unwrap_or_default()
    }
}

fn parse_float(value: &str) -> f32 {
    value.trim().parse().unwrap_or(0.0)
}

fn parse_int(value: &str) -> i32 {
    value.trim().parse().unwrap_or(0)
}

fn parse_bool(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

/// `"(x, y, z)"`, parentheses optional; anything else is the zero vector
fn parse_vec3(value: &str) -> Vec3 {
    let inner = value.trim().trim_start_matches('(').trim_end_matches(')');
    let parts: Vec<&str> = inner.split(',').collect();
    if parts.len() != 3 {
        return Vec3::ZERO;
    }
    match (
        parts[0].trim().parse::<f32>(),
        parts[1].trim().parse::<f32>(),
        parts[2].trim().parse::<f32>(),
    ) {
        (Ok(x), Ok(y), Ok(z)) => Vec3::new(x, y, z),
        _ => Vec3::ZERO,
    }
}

fn format_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

// ============================================================================
// Typed components
// ============================================================================

pub const RIGID_BODY_TYPE: &str = "Rigidbody";
pub const BOX_COLLIDER_TYPE: &str = "BoxCollider";
pub const SPHERE_COLLIDER_TYPE: &str = "SphereCollider";
pub const CAPSULE_COLLIDER_TYPE: &str = "CapsuleCollider";
pub const MESH_COLLIDER_TYPE: &str = "MeshCollider";
pub const PORTAL_LINK_TYPE: &str = "PortalLink";

/// Rigid body settings
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RigidBodySpec {
    pub mass: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub use_gravity: bool,
    pub is_kinematic: bool,
}

/// Capsule orientation axis
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CapsuleAxis {
    #[default]
    X = 0,
    Y = 1,
    Z = 2,
}

impl CapsuleAxis {
    pub fn from_index(index: i32) -> Self {
        match index {
            1 => CapsuleAxis::Y,
            2 => CapsuleAxis::Z,
            0 => CapsuleAxis::X,
            other => {
                log::warn!("CapsuleCollider: unknown direction {}, using X", other);
                CapsuleAxis::X
            }
        }
    }

    pub fn index(self) -> i32 {
        self as i32
    }
}

/// Collision shape
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ColliderShape {
    Box { center: Vec3, size: Vec3 },
    Sphere { center: Vec3, radius: f32 },
    Capsule { center: Vec3, radius: f32, height: f32, direction: CapsuleAxis },
    Mesh { convex: bool },
}

impl ColliderShape {
    /// Wire type name for this shape
    pub fn type_name(&self) -> &'static str {
        match self {
            ColliderShape::Box { .. } => BOX_COLLIDER_TYPE,
            ColliderShape::Sphere { .. } => SPHERE_COLLIDER_TYPE,
            ColliderShape::Capsule { .. } => CAPSULE_COLLIDER_TYPE,
            ColliderShape::Mesh { .. } => MESH_COLLIDER_TYPE,
        }
    }
}

/// Collider settings
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColliderSpec {
    pub is_trigger: bool,
    pub shape: ColliderShape,
}

impl ColliderSpec {
    /// Non-convex, non-trigger mesh collider
    pub fn default_mesh() -> Self {
        Self {
            is_trigger: false,
            shape: ColliderShape::Mesh { convex: false },
        }
    }
}

/// Link to another scene document
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PortalLinkSpec {
    pub destination_url: String,
}

/// A node component
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawComponent", into = "RawComponent")]
pub enum ComponentSpec {
    RigidBody(RigidBodySpec),
    Collider(ColliderSpec),
    PortalLink(PortalLinkSpec),
    /// Unknown type, preserved verbatim
    Unknown(RawComponent),
}

impl ComponentSpec {
    /// Wire type name
    pub fn type_name(&self) -> &str {
        match self {
            ComponentSpec::RigidBody(_) => RIGID_BODY_TYPE,
            ComponentSpec::Collider(collider) => collider.shape.type_name(),
            ComponentSpec::PortalLink(_) => PORTAL_LINK_TYPE,
            ComponentSpec::Unknown(raw) => &raw.type_name,
        }
    }

    pub fn is_collider(&self) -> bool {
        matches!(self, ComponentSpec::Collider(_))
    }
}

impl From<RawComponent> for ComponentSpec {
    fn from(raw: RawComponent) -> Self {
        match decode_known(&raw) {
            Some(spec) => spec,
            None => ComponentSpec::Unknown(raw),
        }
    }
}

fn decode_known(raw: &RawComponent) -> Option<ComponentSpec> {
    let collider = |shape| {
        ComponentSpec::Collider(ColliderSpec {
            is_trigger: raw.bool("isTrigger"),
            shape,
        })
    };

    let spec = match raw.type_name.as_str() {
        RIGID_BODY_TYPE => ComponentSpec::RigidBody(RigidBodySpec {
            mass: raw.float("mass"),
            linear_damping: raw.float("drag"),
            angular_damping: raw.float("angularDrag"),
            use_gravity: raw.bool("useGravity"),
            is_kinematic: raw.bool("isKinematic"),
        }),
        BOX_COLLIDER_TYPE => collider(ColliderShape::Box {
            center: raw.vec3("center"),
            size: raw.vec3("size"),
        }),
        SPHERE_COLLIDER_TYPE => collider(ColliderShape::Sphere {
            center: raw.vec3("center"),
            radius: raw.float("radius"),
        }),
        CAPSULE_COLLIDER_TYPE => collider(ColliderShape::Capsule {
            center: raw.vec3("center"),
            radius: raw.float("radius"),
            height: raw.float("height"),
            direction: CapsuleAxis::from_index(raw.int("direction")),
        }),
        MESH_COLLIDER_TYPE => collider(ColliderShape::Mesh {
            convex: raw.bool("convex"),
        }),
        PORTAL_LINK_TYPE => ComponentSpec::PortalLink(PortalLinkSpec {
            destination_url: raw.get("destinationUrl").unwrap_or_default().to_string(),
        }),
        _ => return None,
    };
    Some(spec)
}

impl From<ComponentSpec> for RawComponent {
    fn from(component: ComponentSpec) -> Self {
        match component {
            ComponentSpec::RigidBody(rb) => RawComponent::new(RIGID_BODY_TYPE)
                .with("mass", rb.mass.to_string())
                .with("drag", rb.linear_damping.to_string())
                .with("angularDrag", rb.angular_damping.to_string())
                .with("useGravity", format_bool(rb.use_gravity))
                .with("isKinematic", format_bool(rb.is_kinematic)),
            ComponentSpec::Collider(collider) => {
                let raw = RawComponent::new(collider.shape.type_name())
                    .with("isTrigger", format_bool(collider.is_trigger));
                match collider.shape {
                    ColliderShape::Box { center, size } => raw
                        .with("center", center.to_string())
                        .with("size", size.to_string()),
                    ColliderShape::Sphere { center, radius } => raw
                        .with("center", center.to_string())
                        .with("radius", radius.to_string()),
                    ColliderShape::Capsule {
                        center,
                        radius,
                        height,
                        direction,
                    } => raw
                        .with("center", center.to_string())
                        .with("radius", radius.to_string())
                        .with("height", height.to_string())
                        .with("direction", direction.index().to_string()),
                    ColliderShape::Mesh { convex } => raw.with("convex", format_bool(convex)),
                }
            }
            ComponentSpec::PortalLink(link) => {
                RawComponent::new(PORTAL_LINK_TYPE).with("destinationUrl", link.destination_url)
            }
            ComponentSpec::Unknown(raw) => raw,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rigid_body_decoding() {
        let raw = RawComponent::new("Rigidbody")
            .with("mass", "2.5")
            .with("drag", "0.1")
            .with("angularDrag", " 0.05 ")
            .with("useGravity", "True")
            .with("isKinematic", "false");

        match ComponentSpec::from(raw) {
            ComponentSpec::RigidBody(rb) => {
                assert_eq!(rb.mass, 2.5);
                assert_eq!(rb.linear_damping, 0.1);
                assert_eq!(rb.angular_damping, 0.05);
                assert!(rb.use_gravity);
                assert!(!rb.is_kinematic);
            }
            other => panic!("expected rigid body, got {:?}", other),
        }
    }

    #[test]
    fn test_unparsable_fields_default_individually() {
        let raw = RawComponent::new("CapsuleCollider")
            .with("isTrigger", "yes")
            .with("center", "(1.000, oops, 3.000)")
            .with("radius", "0.5")
            .with("height", "tall")
            .with("direction", "2");

        let spec = ComponentSpec::from(raw);
        assert_eq!(
            spec,
            ComponentSpec::Collider(ColliderSpec {
                is_trigger: false,
                shape: ColliderShape::Capsule {
                    center: Vec3::ZERO,
                    radius: 0.5,
                    height: 0.0,
                    direction: CapsuleAxis::Z,
                },
            })
        );
    }

    #[test]
    fn test_missing_fields_default() {
        let spec = ComponentSpec::from(RawComponent::new("SphereCollider"));
        assert_eq!(
            spec,
            ComponentSpec::Collider(ColliderSpec {
                is_trigger: false,
                shape: ColliderShape::Sphere {
                    center: Vec3::ZERO,
                    radius: 0.0
                },
            })
        );
    }

    #[test]
    fn test_vec3_parsing() {
        assert_eq!(parse_vec3("(1.000, -2.500, 3.000)"), Vec3::new(1.0, -2.5, 3.0));
        assert_eq!(parse_vec3("1,2,3"), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(parse_vec3("(1, 2)"), Vec3::ZERO);
        assert_eq!(parse_vec3(""), Vec3::ZERO);
    }

    #[test]
    fn test_encoding_format() {
        let raw = RawComponent::from(ComponentSpec::Collider(ColliderSpec {
            is_trigger: true,
            shape: ColliderShape::Box {
                center: Vec3::new(0.0, 0.5, 0.0),
                size: Vec3::new(1.0, 1.0, 2.25),
            },
        }));

        assert_eq!(raw.type_name, "BoxCollider");
        assert_eq!(raw.get("isTrigger"), Some("True"));
        assert_eq!(raw.get("center"), Some("(0.000, 0.500, 0.000)"));
        assert_eq!(raw.get("size"), Some("(1.000, 1.000, 2.250)"));
    }

    #[test]
    fn test_unknown_component_preserved() {
        let json = r#"{"type":"AudioSource","properties":[{"key":"clip","value":"wind.ogg"},{"key":"loop","value":"True"}]}"#;
        let spec: ComponentSpec = serde_json::from_str(json).unwrap();

        assert_eq!(spec.type_name(), "AudioSource");
        assert!(!spec.is_collider());

        let back = serde_json::to_string(&spec).unwrap();
        assert_eq!(back, json);
    }

    #[test]
    fn test_portal_link() {
        let json = r#"{"type":"PortalLink","properties":[{"key":"destinationUrl","value":"https://example.com/plaza.json"}]}"#;
        let spec: ComponentSpec = serde_json::from_str(json).unwrap();
        assert_eq!(
            spec,
            ComponentSpec::PortalLink(PortalLinkSpec {
                destination_url: "https://example.com/plaza.json".into()
            })
        );
    }
}
