//! Newsroom mock data: business units and the users assigned to them.
//!
//! Built once at startup and shared read-only (`Arc<NewsroomData>`) by the
//! REST routes and the newsroom tools.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessUnit {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
    pub business_unit_id: i64,
}

/// Immutable newsroom data set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsroomData {
    business_units: Vec<BusinessUnit>,
    users: Vec<User>,
}

impl NewsroomData {
    pub fn new(business_units: Vec<BusinessUnit>, users: Vec<User>) -> Self {
        Self {
            business_units,
            users,
        }
    }

    /// The demo newsroom: three business units, four users.
    pub fn seed() -> Self {
        let unit = |id, name: &str, slug: &str| BusinessUnit {
            id,
            name: name.to_string(),
            slug: slug.to_string(),
        };
        let user = |id, name: &str, email: &str, role: &str, business_unit_id| User {
            id,
            name: name.to_string(),
            email: email.to_string(),
            role: role.to_string(),
            business_unit_id,
        };

        Self::new(
            vec![
                unit(1, "Editorial", "editorial"),
                unit(2, "Design", "design"),
                unit(3, "Product", "product"),
            ],
            vec![
                user(101, "Alice Ramos", "alice@example.com", "Editor", 1),
                user(102, "Ben Cho", "ben@example.com", "Designer", 2),
                user(103, "Cara Singh", "cara@example.com", "PM", 3),
                user(104, "Diego Ruiz", "diego@example.com", "Reporter", 1),
            ],
        )
    }

    /// All business units, in seed order.
    pub fn business_units(&self) -> &[BusinessUnit] {
        &self.business_units
    }

    /// Users, optionally restricted to one business unit. Seed order is kept.
    pub fn users(&self, business_unit_id: Option<i64>) -> Vec<&User> {
        self.users
            .iter()
            .filter(|u| business_unit_id.map_or(true, |id| u.business_unit_id == id))
            .collect()
    }

    /// `{"business_units": [...]}`
    pub fn business_units_payload(&self) -> serde_json::Value {
        serde_json::json!({ "business_units": self.business_units })
    }

    /// `{"users": [...]}`
    pub fn users_payload(&self, business_unit_id: Option<i64>) -> serde_json::Value {
        serde_json::json!({ "users": self.users(business_unit_id) })
    }
}

impl Default for NewsroomData {
    fn default() -> Self {
        Self::seed()
    }
}
