mod dashboard;
mod maintenance;
mod payments;
mod reviews;
mod rooms;
mod tenants;

pub use dashboard::DashboardView;
pub use maintenance::MaintenanceView;
pub use payments::PaymentsView;
pub use reviews::ReviewsView;
pub use rooms::RoomsView;
pub use tenants::TenantsView;
