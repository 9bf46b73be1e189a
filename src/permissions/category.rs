use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! categories {
    ($($variant:ident => $key:literal, $name:literal;)+) => {
        /// Functional area a permission key belongs to.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum PermissionCategory {
            $(#[serde(rename = $key)] $variant,)+
        }

        impl PermissionCategory {
            /// Every category, in catalog order.
            pub const ALL: &'static [PermissionCategory] = &[$(PermissionCategory::$variant,)+];

            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(PermissionCategory::$variant => $key,)+
                }
            }

            #[must_use]
            pub const fn display_name(self) -> &'static str {
                match self {
                    $(PermissionCategory::$variant => $name,)+
                }
            }

            pub fn parse(s: &str) -> Option<PermissionCategory> {
                match s {
                    $($key => Some(PermissionCategory::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

categories! {
    Dashboard => "dashboard", "Dashboard";
    Inventory => "inventory", "Inventory Management";
    Suppliers => "suppliers", "Supplier Management";
    Equipment => "equipment", "Asset Management";
    Restaurant => "restaurant", "Restaurant Management";
    Reports => "reports", "Reports and Analytics";
    Admin => "admin", "System Administration";
    EmployeeRequests => "employee_requests", "Employee Requests";
    AdvancedFeatures => "advanced_features", "Advanced Features";
    SmartAlerts => "smart_alerts", "Smart Alerts";
    Analytics => "analytics", "Analytics and Advanced Reports";
    Kpi => "kpi", "Key Performance Indicators";
    Security => "security", "Security";
    Workflows => "workflows", "Workflows and Approvals";
    Budgets => "budgets", "Budget Management";
    Organizational => "organizational", "Branches and Departments";
    Documents => "documents", "Document Management";
    Notifications => "notifications", "Notifications";
    EmailNotifications => "email_notifications", "Email Notifications";
    QrBarcode => "qr_barcode", "QR Codes and Barcodes";
    PdfExport => "pdf_export", "PDF Export";
    RealtimeUpdates => "realtime_updates", "Real-time Updates";
    Integrations => "integrations", "External Integrations";
    AdvancedAudit => "advanced_audit", "Advanced Audit Logs";
    MobileApp => "mobile_app", "Mobile Applications";
    FeatureManagement => "feature_management", "Feature Management";
    InventoryAbcAnalysis => "inventory_abc_analysis", "Inventory ABC Analysis";
    InventoryCounts => "inventory_counts", "Periodic Inventory Counts";
    InventoryWarehouses => "inventory_warehouses", "Warehouse Management";
    InventoryCostAnalysis => "inventory_cost_analysis", "Inventory Cost Analysis";
    InventoryRecommendations => "inventory_recommendations", "Order Recommendations";
    InventoryForecasting => "inventory_forecasting", "Inventory Forecasting";
    InventoryPriceHistory => "inventory_price_history", "Price History";
    InventorySupplierPerformance => "inventory_supplier_performance", "Supplier Performance";
    InventoryQrBarcode => "inventory_qrbarcode", "QR/Barcode Scanning";
    InventorySmartAlerts => "inventory_smart_alerts", "Smart Inventory Alerts";
}

impl fmt::Display for PermissionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
