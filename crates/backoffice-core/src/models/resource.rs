/// Record collections managed from the back office.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Products,
    Categories,
    Orders,
    Payments,
    Shipments,
    SiteUsers,
    Reviews,
    Admins,
}

impl Resource {
    pub const ALL: [Resource; 8] = [
        Resource::Products,
        Resource::Categories,
        Resource::Orders,
        Resource::Payments,
        Resource::Shipments,
        Resource::SiteUsers,
        Resource::Reviews,
        Resource::Admins,
    ];

    /// Collection path on the backend
    pub fn collection_path(&self) -> &'static str {
        match self {
            Resource::Products => "/api/admin/product",
            Resource::Categories => "/api/admin/category",
            Resource::Orders => "/api/admin/orders",
            Resource::Payments => "/api/admin/payments",
            Resource::Shipments => "/api/admin/shipments",
            Resource::SiteUsers => "/api/admin/site_user",
            Resource::Reviews => "/api/admin/reviews",
            Resource::Admins => "/api/admin/admin",
        }
    }

    /// Path of a single record. Admin details live under their own route.
    pub fn record_path(&self, id: i64) -> String {
        match self {
            Resource::Admins => format!("/api/admin/show_selected_admin/{}", id),
            _ => format!("{}/{}", self.collection_path(), id),
        }
    }

    /// Path used to update a record
    pub fn update_path(&self, id: i64) -> String {
        match self {
            Resource::Admins => format!("/api/admin/update_selected_admin/{}", id),
            _ => format!("{}/{}", self.collection_path(), id),
        }
    }

    /// Path used to delete a record
    pub fn delete_path(&self, id: i64) -> String {
        format!("{}/{}", self.collection_path(), id)
    }

    pub fn title(&self) -> &'static str {
        match self {
            Resource::Products => "Products",
            Resource::Categories => "Categories",
            Resource::Orders => "Orders",
            Resource::Payments => "Payments",
            Resource::Shipments => "Shipments",
            Resource::SiteUsers => "Users",
            Resource::Reviews => "Reviews",
            Resource::Admins => "Admins",
        }
    }

    /// Whether record updates carry file uploads (sent as multipart)
    pub fn uploads_files(&self) -> bool {
        matches!(self, Resource::Products | Resource::Categories)
    }
}
