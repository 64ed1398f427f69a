pub mod customer_insights;
