use std::collections::BTreeMap;

use serde::Serialize;

use super::PermissionCategory;
use crate::error::{Error, Result};

/// Catalog rows: a category followed by its `(key, display name)` pairs.
pub type CatalogTable = &'static [(PermissionCategory, &'static [(&'static str, &'static str)])];

/// Display metadata for one permission key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PermissionDefinition {
    pub key: &'static str,
    pub name: &'static str,
    pub category: PermissionCategory,
    pub category_name: &'static str,
}

/// Definitions of one category, for permission-editing screens.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryDefinitions {
    pub category: PermissionCategory,
    pub name: &'static str,
    pub permissions: Vec<PermissionDefinition>,
}

/// Immutable key -> metadata catalog, built once at startup.
///
/// Only grants are persisted; definitions never touch the database.
#[derive(Debug, Clone)]
pub struct PermissionRegistry {
    definitions: BTreeMap<&'static str, PermissionDefinition>,
}

impl PermissionRegistry {
    /// The catalog shipped with the application.
    #[must_use]
    pub fn builtin() -> Self {
        Self::from_table(BUILTIN_CATALOG)
    }

    /// Flattens a catalog table. A key listed under several categories
    /// keeps the last category it appears in.
    #[must_use]
    pub fn from_table(table: CatalogTable) -> Self {
        let mut definitions = BTreeMap::new();
        for (category, entries) in table {
            for (key, name) in *entries {
                let definition = PermissionDefinition {
                    key: *key,
                    name: *name,
                    category: *category,
                    category_name: category.display_name(),
                };
                if let Some(previous) = definitions.insert(*key, definition) {
                    tracing::debug!(
                        key = *key,
                        from = %previous.category,
                        to = %category,
                        "permission key redefined in later category"
                    );
                }
            }
        }
        Self { definitions }
    }

    #[must_use]
    pub fn all_definitions(&self) -> &BTreeMap<&'static str, PermissionDefinition> {
        &self.definitions
    }

    #[must_use]
    pub fn definitions_in_category(
        &self,
        category: PermissionCategory,
    ) -> BTreeMap<&'static str, PermissionDefinition> {
        self.definitions
            .iter()
            .filter(|(_, def)| def.category == category)
            .map(|(key, def)| (*key, *def))
            .collect()
    }

    /// Non-empty categories in catalog order.
    #[must_use]
    pub fn categories(&self) -> Vec<CategoryDefinitions> {
        PermissionCategory::ALL
            .iter()
            .filter_map(|category| {
                let permissions: Vec<PermissionDefinition> =
                    self.definitions_in_category(*category).into_values().collect();
                if permissions.is_empty() {
                    return None;
                }
                Some(CategoryDefinitions {
                    category: *category,
                    name: category.display_name(),
                    permissions,
                })
            })
            .collect()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&PermissionDefinition> {
        self.definitions.get(key)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.definitions.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.definitions.keys().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Fails on the first key missing from the catalog.
    pub fn validate_keys<'a>(&self, keys: impl IntoIterator<Item = &'a str>) -> Result<()> {
        for key in keys {
            if !self.contains(key) {
                return Err(Error::UnknownPermission(key.to_string()));
            }
        }
        Ok(())
    }
}

impl Default for PermissionRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

use super::PermissionCategory as C;

pub static BUILTIN_CATALOG: CatalogTable = &[
    (
        C::Dashboard,
        &[
            ("dashboard_view", "View administrative dashboard"),
            ("employee_dashboard_view", "View employee dashboard"),
        ],
    ),
    (
        C::Inventory,
        &[
            ("inventory_view_items", "View item list"),
            ("inventory_add_item", "Add item"),
            ("inventory_edit_item", "Edit items"),
            ("inventory_delete_item", "Delete items"),
            ("inventory_view_categories", "View categories"),
            ("inventory_add_category", "Add category"),
            ("inventory_edit_category", "Edit categories"),
            ("inventory_delete_category", "Delete categories"),
            ("inventory_view_transactions", "View transactions"),
            ("inventory_add_transaction", "Record transaction"),
            ("inventory_edit_transaction", "Edit transactions"),
            ("inventory_delete_transaction", "Delete transactions"),
            ("inventory_export", "Export data"),
            // Re-listed under the dedicated inventory categories below.
            ("inventory_view_warehouses", "View warehouses"),
            ("inventory_add_warehouse", "Add warehouse"),
            ("inventory_edit_warehouse", "Edit warehouses"),
            ("inventory_view_warehouse_items", "View warehouse stock"),
            ("inventory_view_counts", "View periodic counts"),
            ("inventory_add_count", "Start inventory count"),
            ("inventory_view_abc_analysis", "View ABC analysis"),
            ("inventory_edit_abc_analysis", "Update ABC analysis"),
            ("inventory_view_cost_analysis", "View cost analysis"),
            ("inventory_edit_cost_analysis", "Update cost analysis"),
            ("inventory_view_recommendations", "View recommendations"),
            ("inventory_approve_recommendation", "Approve recommendations"),
            ("inventory_view_forecasts", "View forecasts"),
            ("inventory_view_price_history", "View price history"),
            ("inventory_view_supplier_performance", "View supplier performance"),
            ("inventory_view_qrbarcode", "View QR/barcode settings"),
            ("inventory_scan_qrbarcode", "Scan QR/barcode"),
            ("inventory_view_smart_alerts", "View smart alerts"),
            ("inventory_resolve_alert", "Resolve alerts"),
        ],
    ),
    (
        C::Suppliers,
        &[
            ("suppliers_view", "View suppliers"),
            ("suppliers_add", "Add supplier"),
            ("suppliers_edit", "Edit suppliers"),
            ("suppliers_delete", "Delete suppliers"),
            ("suppliers_view_orders", "View purchase orders"),
            ("suppliers_add_order", "Create purchase order"),
            ("suppliers_edit_order", "Edit purchase orders"),
            ("suppliers_delete_order", "Delete purchase orders"),
        ],
    ),
    (
        C::Equipment,
        &[
            ("equipment_view_assets", "View assets"),
            ("equipment_add_asset", "Register asset"),
            ("equipment_edit_asset", "Edit assets"),
            ("equipment_delete_asset", "Delete assets"),
            ("equipment_view_issues", "View asset hand-overs"),
            ("equipment_add_issue", "Hand over asset"),
            ("equipment_return_issue", "Return handed-over asset"),
        ],
    ),
    (
        C::Restaurant,
        &[
            ("restaurant_view_recipes", "View recipes"),
            ("restaurant_add_recipe", "Add recipe"),
            ("restaurant_edit_recipe", "Edit recipes"),
            ("restaurant_delete_recipe", "Delete recipes"),
            ("restaurant_view_meals", "View daily meals"),
            ("restaurant_add_meal", "Record meal"),
            ("restaurant_edit_meal", "Edit meals"),
            ("restaurant_delete_meal", "Delete meals"),
            ("restaurant_view_waste", "View waste records"),
            ("restaurant_add_waste", "Record waste"),
            ("restaurant_edit_waste", "Edit waste records"),
            ("restaurant_approve_waste", "Approve waste"),
            ("restaurant_view_waste_reports", "View waste reports"),
            ("restaurant_view_forecast", "View demand forecast"),
            ("restaurant_add_forecast", "Add forecast"),
            ("restaurant_edit_forecast", "Update forecasts"),
            ("restaurant_view_forecast_reports", "View forecast reports"),
            ("restaurant_view_subsidy", "View subsidies and discounts"),
            ("restaurant_add_subsidy", "Add subsidy"),
            ("restaurant_edit_subsidy", "Edit subsidies"),
            ("restaurant_view_payroll", "View payroll and meal summary"),
            ("restaurant_view_employee_meals", "View employee meals"),
            ("restaurant_add_employee_meal", "Record employee meal"),
            ("restaurant_edit_employee_meal", "Edit employee meals"),
            ("restaurant_view_employee_alerts", "View meal alerts"),
            ("restaurant_view_employee_receipt", "View employee receipts"),
            ("restaurant_view_employee_payments", "View meal payment management"),
            ("restaurant_process_employee_payment", "Process meal payments"),
            ("restaurant_view_payment_history", "View payment history"),
        ],
    ),
    (
        C::Reports,
        &[
            ("reports_view", "View reports page"),
            ("reports_inventory_movement", "Inventory movement report"),
            ("reports_low_stock", "Low stock report"),
            ("reports_asset_inventory", "Asset inventory report"),
            ("reports_meal_consumption", "Meal consumption report"),
            ("reports_generate", "Generate reports"),
            ("reports_export_pdf", "Export reports as PDF"),
            ("reports_export_excel", "Export reports as Excel"),
        ],
    ),
    (
        C::Admin,
        &[
            ("admin_view_users", "View users"),
            ("admin_add_user", "Add user"),
            ("admin_edit_user", "Edit users"),
            ("admin_delete_user", "Delete users"),
            ("admin_manage_permissions", "Manage user permissions"),
            ("admin_view_activity_logs", "View activity log"),
            ("admin_manage_organization_settings", "Organization settings"),
        ],
    ),
    (
        C::EmployeeRequests,
        &[
            ("requests_create", "Create product request"),
            ("requests_view_own", "View own requests"),
            ("requests_view_all", "View all requests"),
            ("requests_approve", "Approve requests"),
            ("requests_reject", "Reject requests"),
            ("requests_manage", "Manage requests"),
        ],
    ),
    (
        C::AdvancedFeatures,
        &[
            ("advanced_notifications_view", "View notifications"),
            ("advanced_alerts_view", "View alerts"),
            ("advanced_api_keys_view", "Manage API keys"),
            ("advanced_approvals_view", "View approvals"),
            ("advanced_budgets_view", "View budgets"),
            ("advanced_audit_logs_view", "View audit logs"),
            ("advanced_backups_view", "Manage backups"),
            ("advanced_documents_view", "View documents"),
            ("advanced_kpi_view", "Manage KPIs"),
        ],
    ),
    (
        C::SmartAlerts,
        &[
            ("alerts_view", "View alerts"),
            ("alerts_create", "Create alert"),
            ("alerts_edit", "Edit alerts"),
            ("alerts_delete", "Delete alerts"),
            ("alerts_history", "View alert history"),
            ("alerts_setup", "Alert settings"),
        ],
    ),
    (
        C::Analytics,
        &[
            ("analytics_view_dashboard", "View analytics dashboard"),
            ("analytics_view_inventory", "Inventory analytics"),
            ("analytics_view_suppliers", "Supplier analytics"),
            ("analytics_view_trends", "Trend analysis"),
            ("analytics_view_predictions", "Predictions"),
            ("analytics_view_reports", "Custom analytic reports"),
            ("analytics_export", "Export analytics"),
        ],
    ),
    (
        C::Kpi,
        &[
            ("kpi_view", "View KPIs"),
            ("kpi_create", "Create KPI"),
            ("kpi_edit", "Edit KPIs"),
            ("kpi_delete", "Delete KPIs"),
            ("kpi_track", "Track KPIs"),
        ],
    ),
    (
        C::Security,
        &[
            ("mfa_setup", "Set up multi-factor authentication"),
            ("login_attempts_view", "View login attempts"),
            ("api_keys_manage", "Manage API keys"),
            ("security_logs", "View security logs"),
            ("backup_manage", "Manage backups"),
            ("backup_schedule", "Schedule backups"),
        ],
    ),
    (
        C::Workflows,
        &[
            ("workflows_view", "View workflows"),
            ("workflows_create", "Create workflow"),
            ("workflows_approve", "Approve requests"),
            ("workflows_reject", "Reject requests"),
            ("workflows_manage", "Manage workflows"),
        ],
    ),
    (
        C::Budgets,
        &[
            ("budgets_view", "View budgets"),
            ("budgets_create", "Create budget"),
            ("budgets_edit", "Edit budgets"),
            ("budgets_delete", "Delete budgets"),
            ("budgets_track", "Track budgets"),
        ],
    ),
    (
        C::Organizational,
        &[
            ("branches_view", "View branches"),
            ("branches_create", "Create branch"),
            ("branches_edit", "Edit branches"),
            ("branches_delete", "Delete branches"),
            ("departments_view", "View departments"),
            ("departments_create", "Create department"),
            ("departments_edit", "Edit departments"),
            ("departments_delete", "Delete departments"),
        ],
    ),
    (
        C::Documents,
        &[
            ("documents_view", "View documents"),
            ("documents_upload", "Upload documents"),
            ("documents_edit", "Edit documents"),
            ("documents_delete", "Delete documents"),
            ("documents_share", "Share documents"),
            ("documents_approve", "Approve documents"),
        ],
    ),
    (
        C::Notifications,
        &[
            ("notifications_view", "View notifications"),
            ("notifications_manage", "Manage notifications"),
            ("notifications_config", "Configure notification channels"),
        ],
    ),
    (
        C::EmailNotifications,
        &[
            ("email_notifications_view", "View email notifications"),
            ("email_notifications_send", "Send email"),
            ("email_notifications_manage", "Manage email notifications"),
            ("email_templates_manage", "Manage email templates"),
            ("email_logs_view", "View email logs"),
        ],
    ),
    (
        C::QrBarcode,
        &[
            ("qr_barcode_generate", "Generate QR codes and barcodes"),
            ("qr_barcode_view", "View codes"),
            ("qr_barcode_scan", "Scan codes"),
            ("qr_barcode_manage", "Manage codes"),
            ("qr_barcode_logs", "View scan logs"),
        ],
    ),
    (
        C::PdfExport,
        &[
            ("pdf_export_create", "Create PDF exports"),
            ("pdf_export_view", "View export jobs"),
            ("pdf_export_download", "Download PDF files"),
            ("pdf_export_manage", "Manage export jobs"),
            ("pdf_export_schedule", "Schedule exports"),
        ],
    ),
    (
        C::RealtimeUpdates,
        &[
            ("realtime_view", "View real-time updates"),
            ("realtime_manage", "Manage updates"),
            ("realtime_dashboard", "Real-time dashboard"),
        ],
    ),
    (
        C::Integrations,
        &[
            ("integrations_view", "View integrations"),
            ("integrations_create", "Create integration"),
            ("integrations_edit", "Edit integrations"),
            ("integrations_delete", "Delete integrations"),
            ("integrations_test", "Test integrations"),
            ("integrations_sync", "Synchronize data"),
            ("integrations_logs", "View integration logs"),
        ],
    ),
    (
        C::AdvancedAudit,
        &[
            ("audit_logs_view", "View audit logs"),
            ("audit_logs_export", "Export audit logs"),
            ("audit_logs_config", "Configure audit logs"),
            ("audit_logs_delete", "Delete audit logs"),
        ],
    ),
    (
        C::MobileApp,
        &[
            ("mobile_devices_view", "View mobile devices"),
            ("mobile_devices_manage", "Manage devices"),
            ("mobile_api_keys_create", "Create API keys"),
            ("mobile_api_keys_manage", "Manage API keys"),
            ("mobile_push_notifications", "Send push notifications"),
        ],
    ),
    (
        C::FeatureManagement,
        &[
            ("feature_flags_view", "View feature flags"),
            ("feature_flags_create", "Create feature"),
            ("feature_flags_edit", "Edit features"),
            ("feature_flags_delete", "Delete features"),
            ("feature_flags_enable", "Enable/disable features"),
        ],
    ),
    (
        C::InventoryAbcAnalysis,
        &[
            ("inventory_view_abc_analysis", "View ABC analysis"),
            ("inventory_edit_abc_analysis", "Update ABC analysis"),
            ("inventory_export_abc_analysis", "Export ABC analysis"),
        ],
    ),
    (
        C::InventoryCounts,
        &[
            ("inventory_view_counts", "View inventory counts"),
            ("inventory_add_count", "Start inventory count"),
            ("inventory_edit_count", "Edit inventory counts"),
            ("inventory_complete_count", "Close inventory count"),
            ("inventory_view_variance", "View stock variances"),
        ],
    ),
    (
        C::InventoryWarehouses,
        &[
            ("inventory_view_warehouses", "View warehouse list"),
            ("inventory_add_warehouse", "Add warehouse"),
            ("inventory_edit_warehouse", "Edit warehouses"),
            ("inventory_delete_warehouse", "Delete warehouses"),
            ("inventory_view_warehouse_items", "View warehouse stock"),
            ("inventory_transfer_between_warehouses", "Transfer stock between warehouses"),
        ],
    ),
    (
        C::InventoryCostAnalysis,
        &[
            ("inventory_view_cost_analysis", "View cost analysis"),
            ("inventory_edit_cost_analysis", "Update cost analysis"),
            ("inventory_export_cost_analysis", "Export cost analysis"),
            ("inventory_view_holding_costs", "View holding costs"),
            ("inventory_view_profitability", "View profitability"),
        ],
    ),
    (
        C::InventoryRecommendations,
        &[
            ("inventory_view_recommendations", "View recommendations"),
            ("inventory_approve_recommendation", "Approve recommendations"),
            ("inventory_reject_recommendation", "Reject recommendations"),
            ("inventory_convert_to_order", "Convert recommendation to purchase order"),
        ],
    ),
    (
        C::InventoryForecasting,
        &[
            ("inventory_view_forecasts", "View forecasts"),
            ("inventory_generate_forecasts", "Generate forecasts"),
            ("inventory_view_stockout_predictions", "View stock-out predictions"),
            ("inventory_export_forecasts", "Export forecasts"),
        ],
    ),
    (
        C::InventoryPriceHistory,
        &[
            ("inventory_view_price_history", "View price history"),
            ("inventory_track_price_changes", "Track price changes"),
            ("inventory_analyze_price_trends", "Analyze price trends"),
            ("inventory_export_price_history", "Export price history"),
        ],
    ),
    (
        C::InventorySupplierPerformance,
        &[
            ("inventory_view_supplier_performance", "View supplier ratings"),
            ("inventory_evaluate_supplier", "Rate suppliers"),
            ("inventory_view_supplier_metrics", "View supplier metrics"),
            ("inventory_compare_suppliers", "Compare suppliers"),
            ("inventory_export_supplier_performance", "Export supplier ratings"),
        ],
    ),
    (
        C::InventoryQrBarcode,
        &[
            ("inventory_view_qrbarcode", "View QR/barcode settings"),
            ("inventory_scan_qrbarcode", "Scan QR/barcode"),
            ("inventory_generate_qr_codes", "Generate QR codes"),
            ("inventory_generate_barcodes", "Generate barcodes"),
            ("inventory_view_scan_history", "View scan history"),
        ],
    ),
    (
        C::InventorySmartAlerts,
        &[
            ("inventory_view_smart_alerts", "View smart alerts"),
            ("inventory_configure_alerts", "Configure alerts"),
            ("inventory_resolve_alert", "Resolve alerts"),
            ("inventory_view_alert_history", "View alert history"),
            ("inventory_alert_notifications", "Manage alert channels"),
        ],
    ),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_contains_core_keys() {
        let registry = PermissionRegistry::builtin();
        assert!(registry.contains("dashboard_view"));
        assert!(registry.contains("admin_manage_permissions"));
        assert!(!registry.contains("bogus_key"));
        assert!(registry.get("bogus_key").is_none());
    }

    #[test]
    fn test_redefined_key_keeps_last_category() {
        let registry = PermissionRegistry::builtin();
        let def = registry.get("inventory_view_warehouses").unwrap();
        assert_eq!(def.category, PermissionCategory::InventoryWarehouses);
        assert_eq!(def.name, "View warehouse list");

        let inventory = registry.definitions_in_category(PermissionCategory::Inventory);
        assert!(inventory.contains_key("inventory_view_items"));
        assert!(!inventory.contains_key("inventory_view_warehouses"));
    }

    #[test]
    fn test_flattened_count_has_no_duplicates() {
        let registry = PermissionRegistry::builtin();
        let listed: usize = BUILTIN_CATALOG.iter().map(|(_, entries)| entries.len()).sum();
        let distinct: std::collections::BTreeSet<&str> = BUILTIN_CATALOG
            .iter()
            .flat_map(|(_, entries)| entries.iter().map(|(key, _)| *key))
            .collect();
        assert!(listed > distinct.len());
        assert_eq!(registry.len(), distinct.len());
    }

    #[test]
    fn test_categories_follow_catalog_order() {
        let registry = PermissionRegistry::builtin();
        let categories = registry.categories();
        assert_eq!(categories[0].category, PermissionCategory::Dashboard);
        assert_eq!(categories[1].category, PermissionCategory::Inventory);
        let total: usize = categories.iter().map(|c| c.permissions.len()).sum();
        assert_eq!(total, registry.len());
    }

    #[test]
    fn test_validate_keys_reports_first_unknown() {
        let registry = PermissionRegistry::builtin();
        assert!(registry.validate_keys(["dashboard_view", "kpi_view"]).is_ok());
        let err = registry
            .validate_keys(["dashboard_view", "bogus_key"])
            .unwrap_err();
        assert!(matches!(err, Error::UnknownPermission(key) if key == "bogus_key"));
    }

    #[test]
    fn test_custom_table() {
        static TABLE: CatalogTable = &[(C::Kpi, &[("kpi_view", "View")])];
        let registry = PermissionRegistry::from_table(TABLE);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("kpi_view").unwrap().category_name, "Key Performance Indicators");
    }
}
