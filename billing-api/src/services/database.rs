//! Database service for billing-api.
//!
//! All invoice item and payment mutations run inside a transaction that
//! locks the invoice row (`SELECT ... FOR UPDATE`) and rewrites the derived
//! totals before committing, so concurrent writers serialize per invoice
//! and no reader can observe a stale total alongside updated rows.

use crate::domain::{self, LineInput};
use crate::models::{
    Account, ActivityLog, BankDetail, Client, Company, CreateBankDetail, CreateClient,
    CreateCompany, CreateInvoice, CreateInvoiceItem, CreatePayment, Invoice, InvoiceItem,
    InvoiceStatus, ListInvoicesFilter, NewAccount, NewActivityLog, Payment,
    RefreshTokenRecord, UpdateBankDetail, UpdateClient, UpdateCompany, UpdateInvoice,
    UpdateInvoiceItem, UpdatePayment,
};
use crate::services::metrics::DB_QUERY_DURATION;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

const INVOICE_COLUMNS: &str = "invoice_id, client_id, company_id, invoice_number, issue_date, due_date, \
     status, jurisdiction, billing_address, billing_city, billing_state, billing_pincode, \
     shipping_address, shipping_city, shipping_state, shipping_pincode, shipping_gstin, \
     subtotal, cgst, sgst, igst, tds, tds_percent, discount_total, total, balance_due, \
     notes, terms, payment_due_date, authorized_signature, created_by, created_utc, \
     finalized_utc, cancelled_utc";

const ITEM_COLUMNS: &str = "item_id, invoice_id, description, hsn_sac, quantity, rate, tax_percent, \
     discount_percent, amount, sort_order, created_utc";

const PAYMENT_COLUMNS: &str =
    "payment_id, invoice_id, amount, payment_date, method, reference, created_utc";

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "billing-api"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Account Operations
    // -------------------------------------------------------------------------

    /// Create an account. A duplicate email maps to Conflict.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn create_account(&self, input: &NewAccount) -> Result<Account, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_account"])
            .start_timer();

        let account_id = Uuid::new_v4();
        let account = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (account_id, email, name, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING account_id, email, name, password_hash, is_active, is_staff, created_utc
            "#,
        )
        .bind(account_id)
        .bind(&input.email)
        .bind(&input.name)
        .bind(&input.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!("Email already registered"))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create account: {}", e)),
        })?;

        timer.observe_duration();

        info!(account_id = %account.account_id, "Account created");

        Ok(account)
    }

    /// Look up an account by email for credential checks.
    #[instrument(skip(self, email))]
    pub async fn get_account_by_email(&self, email: &str) -> Result<Option<Account>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_account_by_email"])
            .start_timer();

        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT account_id, email, name, password_hash, is_active, is_staff, created_utc
            FROM accounts
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get account: {}", e)))?;

        timer.observe_duration();

        Ok(account)
    }

    /// Get an account by ID.
    #[instrument(skip(self), fields(account_id = %account_id))]
    pub async fn get_account(&self, account_id: Uuid) -> Result<Option<Account>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_account"])
            .start_timer();

        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT account_id, email, name, password_hash, is_active, is_staff, created_utc
            FROM accounts
            WHERE account_id = $1
            "#,
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get account: {}", e)))?;

        timer.observe_duration();

        Ok(account)
    }

    // -------------------------------------------------------------------------
    // Refresh Token Operations
    // -------------------------------------------------------------------------

    /// Persist a refresh token row backing a token's `jti` claim.
    #[instrument(skip(self), fields(account_id = %account_id))]
    pub async fn insert_refresh_token(
        &self,
        token_id: Uuid,
        account_id: Uuid,
        expires_utc: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["insert_refresh_token"])
            .start_timer();

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (token_id, account_id, expires_utc)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(token_id)
        .bind(account_id)
        .bind(expires_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to store refresh token: {}", e))
        })?;

        timer.observe_duration();

        Ok(())
    }

    /// Fetch a refresh token row by its id.
    #[instrument(skip(self))]
    pub async fn get_refresh_token(
        &self,
        token_id: Uuid,
    ) -> Result<Option<RefreshTokenRecord>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_refresh_token"])
            .start_timer();

        let record = sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            SELECT token_id, account_id, expires_utc, revoked, created_utc, last_used_utc
            FROM refresh_tokens
            WHERE token_id = $1
            "#,
        )
        .bind(token_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get refresh token: {}", e))
        })?;

        timer.observe_duration();

        Ok(record)
    }

    /// Record a successful use of a refresh token.
    #[instrument(skip(self))]
    pub async fn touch_refresh_token(&self, token_id: Uuid) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["touch_refresh_token"])
            .start_timer();

        sqlx::query("UPDATE refresh_tokens SET last_used_utc = NOW() WHERE token_id = $1")
            .bind(token_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to update refresh token: {}", e))
            })?;

        timer.observe_duration();

        Ok(())
    }

    // -------------------------------------------------------------------------
    // Company Operations
    // -------------------------------------------------------------------------

    /// Create a company. Each account may own exactly one.
    #[instrument(skip(self, input), fields(account_id = %input.account_id))]
    pub async fn create_company(&self, input: &CreateCompany) -> Result<Company, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_company"])
            .start_timer();

        let company_id = Uuid::new_v4();
        let company = sqlx::query_as::<_, Company>(
            r#"
            INSERT INTO companies (company_id, account_id, name, address, gstin, email, phone, logo_path)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING company_id, account_id, name, address, gstin, email, phone, logo_path, created_utc
            "#,
        )
        .bind(company_id)
        .bind(input.account_id)
        .bind(&input.name)
        .bind(&input.address)
        .bind(&input.gstin)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.logo_path)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!("Account already has a company profile"))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create company: {}", e)),
        })?;

        timer.observe_duration();

        info!(company_id = %company.company_id, name = %company.name, "Company created");

        Ok(company)
    }

    /// Get a company by ID.
    #[instrument(skip(self), fields(company_id = %company_id))]
    pub async fn get_company(&self, company_id: Uuid) -> Result<Option<Company>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_company"])
            .start_timer();

        let company = sqlx::query_as::<_, Company>(
            r#"
            SELECT company_id, account_id, name, address, gstin, email, phone, logo_path, created_utc
            FROM companies
            WHERE company_id = $1
            "#,
        )
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get company: {}", e)))?;

        timer.observe_duration();

        Ok(company)
    }

    /// List companies.
    #[instrument(skip(self))]
    pub async fn list_companies(&self, page_size: i32) -> Result<Vec<Company>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_companies"])
            .start_timer();

        let limit = page_size.clamp(1, 100) as i64;
        let companies = sqlx::query_as::<_, Company>(
            r#"
            SELECT company_id, account_id, name, address, gstin, email, phone, logo_path, created_utc
            FROM companies
            ORDER BY created_utc DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list companies: {}", e)))?;

        timer.observe_duration();

        Ok(companies)
    }

    /// Update a company.
    #[instrument(skip(self, input), fields(company_id = %company_id))]
    pub async fn update_company(
        &self,
        company_id: Uuid,
        input: &UpdateCompany,
    ) -> Result<Option<Company>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_company"])
            .start_timer();

        let company = sqlx::query_as::<_, Company>(
            r#"
            UPDATE companies
            SET name = COALESCE($2, name),
                address = COALESCE($3, address),
                gstin = COALESCE($4, gstin),
                email = COALESCE($5, email),
                phone = COALESCE($6, phone),
                logo_path = COALESCE($7, logo_path)
            WHERE company_id = $1
            RETURNING company_id, account_id, name, address, gstin, email, phone, logo_path, created_utc
            "#,
        )
        .bind(company_id)
        .bind(&input.name)
        .bind(&input.address)
        .bind(&input.gstin)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.logo_path)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update company: {}", e)))?;

        timer.observe_duration();

        Ok(company)
    }

    /// Delete a company. Dependent invoices and bank details cascade.
    #[instrument(skip(self), fields(company_id = %company_id))]
    pub async fn delete_company(&self, company_id: Uuid) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_company"])
            .start_timer();

        let result = sqlx::query("DELETE FROM companies WHERE company_id = $1")
            .bind(company_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete company: {}", e))
            })?;

        timer.observe_duration();

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(company_id = %company_id, "Company deleted");
        }

        Ok(deleted)
    }

    // -------------------------------------------------------------------------
    // Client Operations
    // -------------------------------------------------------------------------

    /// Create a client.
    #[instrument(skip(self, input))]
    pub async fn create_client(&self, input: &CreateClient) -> Result<Client, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_client"])
            .start_timer();

        let client_id = Uuid::new_v4();
        let client = sqlx::query_as::<_, Client>(
            r#"
            INSERT INTO clients (
                client_id, name, contact_person, email, phone,
                billing_address, billing_city, billing_state, billing_pincode,
                shipping_address, shipping_city, shipping_state, shipping_pincode,
                gstin, website
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING client_id, name, contact_person, email, phone,
                billing_address, billing_city, billing_state, billing_pincode,
                shipping_address, shipping_city, shipping_state, shipping_pincode,
                gstin, website, created_utc
            "#,
        )
        .bind(client_id)
        .bind(&input.name)
        .bind(&input.contact_person)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.billing_address)
        .bind(&input.billing_city)
        .bind(&input.billing_state)
        .bind(&input.billing_pincode)
        .bind(&input.shipping_address)
        .bind(&input.shipping_city)
        .bind(&input.shipping_state)
        .bind(&input.shipping_pincode)
        .bind(&input.gstin)
        .bind(&input.website)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create client: {}", e)))?;

        timer.observe_duration();

        info!(client_id = %client.client_id, name = %client.name, "Client created");

        Ok(client)
    }

    /// Get a client by ID.
    #[instrument(skip(self), fields(client_id = %client_id))]
    pub async fn get_client(&self, client_id: Uuid) -> Result<Option<Client>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_client"])
            .start_timer();

        let client = sqlx::query_as::<_, Client>(
            r#"
            SELECT client_id, name, contact_person, email, phone,
                billing_address, billing_city, billing_state, billing_pincode,
                shipping_address, shipping_city, shipping_state, shipping_pincode,
                gstin, website, created_utc
            FROM clients
            WHERE client_id = $1
            "#,
        )
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get client: {}", e)))?;

        timer.observe_duration();

        Ok(client)
    }

    /// List clients.
    #[instrument(skip(self))]
    pub async fn list_clients(&self, page_size: i32) -> Result<Vec<Client>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_clients"])
            .start_timer();

        let limit = page_size.clamp(1, 100) as i64;
        let clients = sqlx::query_as::<_, Client>(
            r#"
            SELECT client_id, name, contact_person, email, phone,
                billing_address, billing_city, billing_state, billing_pincode,
                shipping_address, shipping_city, shipping_state, shipping_pincode,
                gstin, website, created_utc
            FROM clients
            ORDER BY created_utc DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list clients: {}", e)))?;

        timer.observe_duration();

        Ok(clients)
    }

    /// Update a client. Existing invoices keep their address snapshot.
    #[instrument(skip(self, input), fields(client_id = %client_id))]
    pub async fn update_client(
        &self,
        client_id: Uuid,
        input: &UpdateClient,
    ) -> Result<Option<Client>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_client"])
            .start_timer();

        let client = sqlx::query_as::<_, Client>(
            r#"
            UPDATE clients
            SET name = COALESCE($2, name),
                contact_person = COALESCE($3, contact_person),
                email = COALESCE($4, email),
                phone = COALESCE($5, phone),
                billing_address = COALESCE($6, billing_address),
                billing_city = COALESCE($7, billing_city),
                billing_state = COALESCE($8, billing_state),
                billing_pincode = COALESCE($9, billing_pincode),
                shipping_address = COALESCE($10, shipping_address),
                shipping_city = COALESCE($11, shipping_city),
                shipping_state = COALESCE($12, shipping_state),
                shipping_pincode = COALESCE($13, shipping_pincode),
                gstin = COALESCE($14, gstin),
                website = COALESCE($15, website)
            WHERE client_id = $1
            RETURNING client_id, name, contact_person, email, phone,
                billing_address, billing_city, billing_state, billing_pincode,
                shipping_address, shipping_city, shipping_state, shipping_pincode,
                gstin, website, created_utc
            "#,
        )
        .bind(client_id)
        .bind(&input.name)
        .bind(&input.contact_person)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.billing_address)
        .bind(&input.billing_city)
        .bind(&input.billing_state)
        .bind(&input.billing_pincode)
        .bind(&input.shipping_address)
        .bind(&input.shipping_city)
        .bind(&input.shipping_state)
        .bind(&input.shipping_pincode)
        .bind(&input.gstin)
        .bind(&input.website)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update client: {}", e)))?;

        timer.observe_duration();

        Ok(client)
    }

    /// Delete a client. Dependent invoices cascade.
    #[instrument(skip(self), fields(client_id = %client_id))]
    pub async fn delete_client(&self, client_id: Uuid) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_client"])
            .start_timer();

        let result = sqlx::query("DELETE FROM clients WHERE client_id = $1")
            .bind(client_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete client: {}", e))
            })?;

        timer.observe_duration();

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(client_id = %client_id, "Client deleted");
        }

        Ok(deleted)
    }

    // -------------------------------------------------------------------------
    // Bank Detail Operations
    // -------------------------------------------------------------------------

    /// Create a bank detail record for a company.
    #[instrument(skip(self, input), fields(company_id = %input.company_id))]
    pub async fn create_bank_detail(
        &self,
        input: &CreateBankDetail,
    ) -> Result<BankDetail, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_bank_detail"])
            .start_timer();

        if self.get_company(input.company_id).await?.is_none() {
            return Err(AppError::NotFound(anyhow::anyhow!("Company not found")));
        }

        let bank_detail_id = Uuid::new_v4();
        let bank_detail = sqlx::query_as::<_, BankDetail>(
            r#"
            INSERT INTO bank_details (bank_detail_id, company_id, account_name, account_number, ifsc_code, bank_name)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING bank_detail_id, company_id, account_name, account_number, ifsc_code, bank_name, created_utc
            "#,
        )
        .bind(bank_detail_id)
        .bind(input.company_id)
        .bind(&input.account_name)
        .bind(&input.account_number)
        .bind(&input.ifsc_code)
        .bind(&input.bank_name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to create bank detail: {}", e))
        })?;

        timer.observe_duration();

        info!(bank_detail_id = %bank_detail.bank_detail_id, "Bank detail created");

        Ok(bank_detail)
    }

    /// Get a bank detail by ID.
    #[instrument(skip(self), fields(bank_detail_id = %bank_detail_id))]
    pub async fn get_bank_detail(
        &self,
        bank_detail_id: Uuid,
    ) -> Result<Option<BankDetail>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_bank_detail"])
            .start_timer();

        let bank_detail = sqlx::query_as::<_, BankDetail>(
            r#"
            SELECT bank_detail_id, company_id, account_name, account_number, ifsc_code, bank_name, created_utc
            FROM bank_details
            WHERE bank_detail_id = $1
            "#,
        )
        .bind(bank_detail_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get bank detail: {}", e))
        })?;

        timer.observe_duration();

        Ok(bank_detail)
    }

    /// List bank details, optionally scoped to a company.
    #[instrument(skip(self))]
    pub async fn list_bank_details(
        &self,
        company_id: Option<Uuid>,
        page_size: i32,
    ) -> Result<Vec<BankDetail>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_bank_details"])
            .start_timer();

        let limit = page_size.clamp(1, 100) as i64;
        let bank_details = sqlx::query_as::<_, BankDetail>(
            r#"
            SELECT bank_detail_id, company_id, account_name, account_number, ifsc_code, bank_name, created_utc
            FROM bank_details
            WHERE ($1::uuid IS NULL OR company_id = $1)
            ORDER BY created_utc DESC
            LIMIT $2
            "#,
        )
        .bind(company_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list bank details: {}", e))
        })?;

        timer.observe_duration();

        Ok(bank_details)
    }

    /// Update a bank detail.
    #[instrument(skip(self, input), fields(bank_detail_id = %bank_detail_id))]
    pub async fn update_bank_detail(
        &self,
        bank_detail_id: Uuid,
        input: &UpdateBankDetail,
    ) -> Result<Option<BankDetail>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_bank_detail"])
            .start_timer();

        let bank_detail = sqlx::query_as::<_, BankDetail>(
            r#"
            UPDATE bank_details
            SET account_name = COALESCE($2, account_name),
                account_number = COALESCE($3, account_number),
                ifsc_code = COALESCE($4, ifsc_code),
                bank_name = COALESCE($5, bank_name)
            WHERE bank_detail_id = $1
            RETURNING bank_detail_id, company_id, account_name, account_number, ifsc_code, bank_name, created_utc
            "#,
        )
        .bind(bank_detail_id)
        .bind(&input.account_name)
        .bind(&input.account_number)
        .bind(&input.ifsc_code)
        .bind(&input.bank_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to update bank detail: {}", e))
        })?;

        timer.observe_duration();

        Ok(bank_detail)
    }

    /// Delete a bank detail.
    #[instrument(skip(self), fields(bank_detail_id = %bank_detail_id))]
    pub async fn delete_bank_detail(&self, bank_detail_id: Uuid) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_bank_detail"])
            .start_timer();

        let result = sqlx::query("DELETE FROM bank_details WHERE bank_detail_id = $1")
            .bind(bank_detail_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete bank detail: {}", e))
            })?;

        timer.observe_duration();

        Ok(result.rows_affected() > 0)
    }

    // -------------------------------------------------------------------------
    // Invoice Operations
    // -------------------------------------------------------------------------

    /// Create a draft invoice. Totals start from the (empty) item list and
    /// the supplied overrides; a duplicate invoice_number maps to Conflict
    /// and persists nothing.
    #[instrument(skip(self, input), fields(invoice_number = %input.invoice_number))]
    pub async fn create_invoice(&self, input: &CreateInvoice) -> Result<Invoice, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_invoice"])
            .start_timer();

        // Validates the overrides up front; an empty draft has zero totals.
        let totals = domain::compute_totals(
            &[],
            input.jurisdiction,
            input.tds_percent,
            input.discount_total,
        )?;

        let invoice_id = Uuid::new_v4();
        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            INSERT INTO invoices (
                invoice_id, client_id, company_id, invoice_number, issue_date, due_date,
                status, jurisdiction,
                billing_address, billing_city, billing_state, billing_pincode,
                shipping_address, shipping_city, shipping_state, shipping_pincode, shipping_gstin,
                subtotal, cgst, sgst, igst, tds, tds_percent, discount_total, total, balance_due,
                notes, terms, payment_due_date, authorized_signature, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                    $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29, $30, $31)
            RETURNING {INVOICE_COLUMNS}
            "#
        ))
        .bind(invoice_id)
        .bind(input.client_id)
        .bind(input.company_id)
        .bind(&input.invoice_number)
        .bind(input.issue_date)
        .bind(input.due_date)
        .bind(InvoiceStatus::Draft.as_str())
        .bind(input.jurisdiction.as_str())
        .bind(&input.billing_address)
        .bind(&input.billing_city)
        .bind(&input.billing_state)
        .bind(&input.billing_pincode)
        .bind(&input.shipping_address)
        .bind(&input.shipping_city)
        .bind(&input.shipping_state)
        .bind(&input.shipping_pincode)
        .bind(&input.shipping_gstin)
        .bind(totals.subtotal)
        .bind(totals.cgst)
        .bind(totals.sgst)
        .bind(totals.igst)
        .bind(totals.tds)
        .bind(input.tds_percent)
        .bind(totals.discount_total)
        .bind(totals.total)
        .bind(totals.total)
        .bind(&input.notes)
        .bind(&input.terms)
        .bind(input.payment_due_date)
        .bind(&input.authorized_signature)
        .bind(input.created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!(
                    "Invoice number '{}' already exists",
                    input.invoice_number
                ))
            }
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                AppError::NotFound(anyhow::anyhow!("Client or company not found"))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create invoice: {}", e)),
        })?;

        timer.observe_duration();

        info!(
            invoice_id = %invoice.invoice_id,
            invoice_number = %invoice.invoice_number,
            "Invoice created"
        );

        Ok(invoice)
    }

    /// Get an invoice by ID.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn get_invoice(&self, invoice_id: Uuid) -> Result<Option<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_invoice"])
            .start_timer();

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE invoice_id = $1"
        ))
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get invoice: {}", e)))?;

        timer.observe_duration();

        Ok(invoice)
    }

    /// List invoices with optional filters and keyset pagination.
    #[instrument(skip(self, filter))]
    pub async fn list_invoices(
        &self,
        filter: &ListInvoicesFilter,
    ) -> Result<Vec<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_invoices"])
            .start_timer();

        let limit = filter.page_size.clamp(1, 100) as i64;
        let status_str = filter.status.map(|s| s.as_str().to_string());

        let invoices = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            SELECT {INVOICE_COLUMNS}
            FROM invoices
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR client_id = $2)
              AND ($3::uuid IS NULL OR company_id = $3)
              AND ($4::uuid IS NULL OR invoice_id > $4)
            ORDER BY invoice_id
            LIMIT $5
            "#
        ))
        .bind(status_str)
        .bind(filter.client_id)
        .bind(filter.company_id)
        .bind(filter.page_token)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list invoices: {}", e)))?;

        timer.observe_duration();

        Ok(invoices)
    }

    /// Update a draft invoice and recompute its totals in one transaction.
    #[instrument(skip(self, input), fields(invoice_id = %invoice_id))]
    pub async fn update_invoice(
        &self,
        invoice_id: Uuid,
        input: &UpdateInvoice,
    ) -> Result<Option<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_invoice"])
            .start_timer();

        let mut tx = self.begin().await?;

        let invoice = match Self::lock_invoice(&mut tx, invoice_id).await? {
            Some(invoice) => invoice,
            None => return Ok(None),
        };
        if !domain::items_mutable(invoice.status_enum()) {
            return Err(AppError::InvalidStateTransition(anyhow::anyhow!(
                "Only draft invoices can be updated"
            )));
        }

        let jurisdiction_str = input.jurisdiction.map(|j| j.as_str().to_string());
        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            UPDATE invoices
            SET issue_date = COALESCE($2, issue_date),
                due_date = COALESCE($3, due_date),
                jurisdiction = COALESCE($4, jurisdiction),
                shipping_gstin = COALESCE($5, shipping_gstin),
                tds_percent = COALESCE($6, tds_percent),
                discount_total = COALESCE($7, discount_total),
                notes = COALESCE($8, notes),
                terms = COALESCE($9, terms),
                payment_due_date = COALESCE($10, payment_due_date),
                authorized_signature = COALESCE($11, authorized_signature)
            WHERE invoice_id = $1
            RETURNING {INVOICE_COLUMNS}
            "#
        ))
        .bind(invoice_id)
        .bind(input.issue_date)
        .bind(input.due_date)
        .bind(jurisdiction_str)
        .bind(&input.shipping_gstin)
        .bind(input.tds_percent)
        .bind(input.discount_total)
        .bind(&input.notes)
        .bind(&input.terms)
        .bind(input.payment_due_date)
        .bind(&input.authorized_signature)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update invoice: {}", e)))?;

        let invoice = Self::recompute_totals(&mut tx, &invoice).await?;

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to commit: {}", e)))?;

        timer.observe_duration();

        info!(invoice_id = %invoice.invoice_id, "Invoice updated");

        Ok(Some(invoice))
    }

    /// Finalize a draft invoice: items freeze and payments become allowed.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn finalize_invoice(&self, invoice_id: Uuid) -> Result<Option<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["finalize_invoice"])
            .start_timer();

        let mut tx = self.begin().await?;

        let invoice = match Self::lock_invoice(&mut tx, invoice_id).await? {
            Some(invoice) => invoice,
            None => return Ok(None),
        };
        domain::ensure_transition(invoice.status_enum(), InvoiceStatus::Finalized)?;

        // Settle derived fields before freezing them.
        let invoice = Self::recompute_totals(&mut tx, &invoice).await?;

        let items = Self::fetch_items(&mut tx, invoice_id).await?;
        if items.is_empty() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Cannot finalize an invoice with no items"
            )));
        }
        if invoice.subtotal == Decimal::ZERO {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Cannot finalize an invoice with a zero subtotal"
            )));
        }

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            UPDATE invoices
            SET status = $2, finalized_utc = NOW()
            WHERE invoice_id = $1
            RETURNING {INVOICE_COLUMNS}
            "#
        ))
        .bind(invoice_id)
        .bind(InvoiceStatus::Finalized.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to finalize invoice: {}", e))
        })?;

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to commit: {}", e)))?;

        timer.observe_duration();

        info!(
            invoice_id = %invoice.invoice_id,
            invoice_number = %invoice.invoice_number,
            "Invoice finalized"
        );

        Ok(Some(invoice))
    }

    /// Cancel a draft or finalized invoice.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn cancel_invoice(&self, invoice_id: Uuid) -> Result<Option<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["cancel_invoice"])
            .start_timer();

        let mut tx = self.begin().await?;

        let invoice = match Self::lock_invoice(&mut tx, invoice_id).await? {
            Some(invoice) => invoice,
            None => return Ok(None),
        };
        domain::ensure_transition(invoice.status_enum(), InvoiceStatus::Cancelled)?;

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            UPDATE invoices
            SET status = $2, cancelled_utc = NOW()
            WHERE invoice_id = $1
            RETURNING {INVOICE_COLUMNS}
            "#
        ))
        .bind(invoice_id)
        .bind(InvoiceStatus::Cancelled.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to cancel invoice: {}", e))
        })?;

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to commit: {}", e)))?;

        timer.observe_duration();

        info!(invoice_id = %invoice.invoice_id, "Invoice cancelled");

        Ok(Some(invoice))
    }

    /// Delete a draft invoice. Finalized and cancelled invoices are history.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn delete_invoice(&self, invoice_id: Uuid) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_invoice"])
            .start_timer();

        let result = sqlx::query("DELETE FROM invoices WHERE invoice_id = $1 AND status = $2")
            .bind(invoice_id)
            .bind(InvoiceStatus::Draft.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete invoice: {}", e))
            })?;

        timer.observe_duration();

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(invoice_id = %invoice_id, "Draft invoice deleted");
        }

        Ok(deleted)
    }

    // -------------------------------------------------------------------------
    // Invoice Item Operations
    // -------------------------------------------------------------------------

    /// Add a line to a draft invoice and recompute totals atomically.
    #[instrument(skip(self, input), fields(invoice_id = %input.invoice_id))]
    pub async fn add_invoice_item(
        &self,
        input: &CreateInvoiceItem,
    ) -> Result<InvoiceItem, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["add_invoice_item"])
            .start_timer();

        let mut tx = self.begin().await?;

        let invoice = Self::lock_invoice(&mut tx, input.invoice_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;
        if !domain::items_mutable(invoice.status_enum()) {
            return Err(AppError::InvalidStateTransition(anyhow::anyhow!(
                "Can only add items to draft invoices"
            )));
        }

        let amounts = domain::line_amounts(&LineInput {
            quantity: input.quantity,
            rate: input.rate,
            tax_percent: input.tax_percent,
            discount_percent: input.discount_percent,
        })?;

        let item_id = Uuid::new_v4();
        let item = sqlx::query_as::<_, InvoiceItem>(&format!(
            r#"
            INSERT INTO invoice_items (
                item_id, invoice_id, description, hsn_sac, quantity, rate,
                tax_percent, discount_percent, amount, sort_order
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(item_id)
        .bind(input.invoice_id)
        .bind(&input.description)
        .bind(&input.hsn_sac)
        .bind(input.quantity)
        .bind(input.rate)
        .bind(input.tax_percent)
        .bind(input.discount_percent)
        .bind(amounts.amount)
        .bind(input.sort_order)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to add item: {}", e)))?;

        Self::recompute_totals(&mut tx, &invoice).await?;

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to commit: {}", e)))?;

        timer.observe_duration();

        info!(item_id = %item.item_id, "Invoice item added");

        Ok(item)
    }

    /// Get the ordered item list for an invoice.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn list_invoice_items(
        &self,
        invoice_id: Uuid,
    ) -> Result<Vec<InvoiceItem>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_invoice_items"])
            .start_timer();

        let items = sqlx::query_as::<_, InvoiceItem>(&format!(
            r#"
            SELECT {ITEM_COLUMNS}
            FROM invoice_items
            WHERE invoice_id = $1
            ORDER BY sort_order, created_utc
            "#
        ))
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list items: {}", e)))?;

        timer.observe_duration();

        Ok(items)
    }

    /// Get a single line item.
    #[instrument(skip(self), fields(invoice_id = %invoice_id, item_id = %item_id))]
    pub async fn get_invoice_item(
        &self,
        invoice_id: Uuid,
        item_id: Uuid,
    ) -> Result<Option<InvoiceItem>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_invoice_item"])
            .start_timer();

        let item = sqlx::query_as::<_, InvoiceItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM invoice_items WHERE invoice_id = $1 AND item_id = $2"
        ))
        .bind(invoice_id)
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get item: {}", e)))?;

        timer.observe_duration();

        Ok(item)
    }

    /// Update a line on a draft invoice and recompute totals atomically.
    #[instrument(skip(self, input), fields(invoice_id = %invoice_id, item_id = %item_id))]
    pub async fn update_invoice_item(
        &self,
        invoice_id: Uuid,
        item_id: Uuid,
        input: &UpdateInvoiceItem,
    ) -> Result<Option<InvoiceItem>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_invoice_item"])
            .start_timer();

        let mut tx = self.begin().await?;

        let invoice = match Self::lock_invoice(&mut tx, invoice_id).await? {
            Some(invoice) => invoice,
            None => return Ok(None),
        };
        if !domain::items_mutable(invoice.status_enum()) {
            return Err(AppError::InvalidStateTransition(anyhow::anyhow!(
                "Can only update items on draft invoices"
            )));
        }

        let existing = sqlx::query_as::<_, InvoiceItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM invoice_items WHERE invoice_id = $1 AND item_id = $2"
        ))
        .bind(invoice_id)
        .bind(item_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get item: {}", e)))?;

        let existing = match existing {
            Some(item) => item,
            None => return Ok(None),
        };

        // Merge before deriving the stored amount, so it always matches the
        // written quantity/rate/percent values.
        let quantity = input.quantity.unwrap_or(existing.quantity);
        let rate = input.rate.unwrap_or(existing.rate);
        let tax_percent = input.tax_percent.unwrap_or(existing.tax_percent);
        let discount_percent = input.discount_percent.unwrap_or(existing.discount_percent);
        let amounts = domain::line_amounts(&LineInput {
            quantity,
            rate,
            tax_percent,
            discount_percent,
        })?;

        let item = sqlx::query_as::<_, InvoiceItem>(&format!(
            r#"
            UPDATE invoice_items
            SET description = COALESCE($3, description),
                hsn_sac = COALESCE($4, hsn_sac),
                quantity = $5,
                rate = $6,
                tax_percent = $7,
                discount_percent = $8,
                amount = $9,
                sort_order = COALESCE($10, sort_order)
            WHERE invoice_id = $1 AND item_id = $2
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(invoice_id)
        .bind(item_id)
        .bind(&input.description)
        .bind(&input.hsn_sac)
        .bind(quantity)
        .bind(rate)
        .bind(tax_percent)
        .bind(discount_percent)
        .bind(amounts.amount)
        .bind(input.sort_order)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update item: {}", e)))?;

        Self::recompute_totals(&mut tx, &invoice).await?;

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to commit: {}", e)))?;

        timer.observe_duration();

        Ok(Some(item))
    }

    /// Remove a line from a draft invoice and recompute totals atomically.
    #[instrument(skip(self), fields(invoice_id = %invoice_id, item_id = %item_id))]
    pub async fn remove_invoice_item(
        &self,
        invoice_id: Uuid,
        item_id: Uuid,
    ) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["remove_invoice_item"])
            .start_timer();

        let mut tx = self.begin().await?;

        let invoice = match Self::lock_invoice(&mut tx, invoice_id).await? {
            Some(invoice) => invoice,
            None => return Ok(false),
        };
        if !domain::items_mutable(invoice.status_enum()) {
            return Err(AppError::InvalidStateTransition(anyhow::anyhow!(
                "Can only remove items from draft invoices"
            )));
        }

        let result =
            sqlx::query("DELETE FROM invoice_items WHERE invoice_id = $1 AND item_id = $2")
                .bind(invoice_id)
                .bind(item_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to remove item: {}", e))
                })?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            Self::recompute_totals(&mut tx, &invoice).await?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to commit: {}", e)))?;

        timer.observe_duration();

        Ok(deleted)
    }

    // -------------------------------------------------------------------------
    // Payment Operations
    // -------------------------------------------------------------------------

    /// Record a payment against a finalized invoice. The balance is
    /// recomputed in the same transaction; overpayment is allowed and drives
    /// the balance negative rather than being clamped.
    #[instrument(skip(self, input), fields(invoice_id = %input.invoice_id))]
    pub async fn record_payment(&self, input: &CreatePayment) -> Result<Payment, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["record_payment"])
            .start_timer();

        if input.amount < Decimal::ZERO {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Payment amount must be non-negative"
            )));
        }

        let mut tx = self.begin().await?;

        let invoice = Self::lock_invoice(&mut tx, input.invoice_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;
        if !domain::payments_allowed(invoice.status_enum()) {
            return Err(AppError::InvalidStateTransition(anyhow::anyhow!(
                "Payments can only be recorded against finalized invoices"
            )));
        }

        let payment_id = Uuid::new_v4();
        let payment = sqlx::query_as::<_, Payment>(&format!(
            r#"
            INSERT INTO payments (payment_id, invoice_id, amount, payment_date, method, reference)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(payment_id)
        .bind(input.invoice_id)
        .bind(input.amount)
        .bind(input.payment_date)
        .bind(&input.method)
        .bind(&input.reference)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to record payment: {}", e)))?;

        Self::recompute_totals(&mut tx, &invoice).await?;

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to commit: {}", e)))?;

        timer.observe_duration();

        info!(
            payment_id = %payment.payment_id,
            amount = %payment.amount,
            "Payment recorded"
        );

        Ok(payment)
    }

    /// Get a payment by ID.
    #[instrument(skip(self), fields(invoice_id = %invoice_id, payment_id = %payment_id))]
    pub async fn get_payment(
        &self,
        invoice_id: Uuid,
        payment_id: Uuid,
    ) -> Result<Option<Payment>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_payment"])
            .start_timer();

        let payment = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE invoice_id = $1 AND payment_id = $2"
        ))
        .bind(invoice_id)
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get payment: {}", e)))?;

        timer.observe_duration();

        Ok(payment)
    }

    /// List payments for an invoice.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn list_payments(&self, invoice_id: Uuid) -> Result<Vec<Payment>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_payments"])
            .start_timer();

        let payments = sqlx::query_as::<_, Payment>(&format!(
            r#"
            SELECT {PAYMENT_COLUMNS}
            FROM payments
            WHERE invoice_id = $1
            ORDER BY payment_date, created_utc
            "#
        ))
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list payments: {}", e)))?;

        timer.observe_duration();

        Ok(payments)
    }

    /// Correct a payment on a finalized invoice; the balance follows.
    #[instrument(skip(self, input), fields(invoice_id = %invoice_id, payment_id = %payment_id))]
    pub async fn update_payment(
        &self,
        invoice_id: Uuid,
        payment_id: Uuid,
        input: &UpdatePayment,
    ) -> Result<Option<Payment>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_payment"])
            .start_timer();

        if let Some(amount) = input.amount {
            if amount < Decimal::ZERO {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Payment amount must be non-negative"
                )));
            }
        }

        let mut tx = self.begin().await?;

        let invoice = match Self::lock_invoice(&mut tx, invoice_id).await? {
            Some(invoice) => invoice,
            None => return Ok(None),
        };
        if !domain::payments_allowed(invoice.status_enum()) {
            return Err(AppError::InvalidStateTransition(anyhow::anyhow!(
                "Payments can only be edited on finalized invoices"
            )));
        }

        let payment = sqlx::query_as::<_, Payment>(&format!(
            r#"
            UPDATE payments
            SET amount = COALESCE($3, amount),
                payment_date = COALESCE($4, payment_date),
                method = COALESCE($5, method),
                reference = COALESCE($6, reference)
            WHERE invoice_id = $1 AND payment_id = $2
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(invoice_id)
        .bind(payment_id)
        .bind(input.amount)
        .bind(input.payment_date)
        .bind(&input.method)
        .bind(&input.reference)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update payment: {}", e)))?;

        let payment = match payment {
            Some(payment) => payment,
            None => return Ok(None),
        };

        Self::recompute_totals(&mut tx, &invoice).await?;

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to commit: {}", e)))?;

        timer.observe_duration();

        Ok(Some(payment))
    }

    /// Remove a payment from a finalized invoice; the balance follows.
    #[instrument(skip(self), fields(invoice_id = %invoice_id, payment_id = %payment_id))]
    pub async fn delete_payment(
        &self,
        invoice_id: Uuid,
        payment_id: Uuid,
    ) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_payment"])
            .start_timer();

        let mut tx = self.begin().await?;

        let invoice = match Self::lock_invoice(&mut tx, invoice_id).await? {
            Some(invoice) => invoice,
            None => return Ok(false),
        };
        if !domain::payments_allowed(invoice.status_enum()) {
            return Err(AppError::InvalidStateTransition(anyhow::anyhow!(
                "Payments can only be removed from finalized invoices"
            )));
        }

        let result = sqlx::query("DELETE FROM payments WHERE invoice_id = $1 AND payment_id = $2")
            .bind(invoice_id)
            .bind(payment_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete payment: {}", e))
            })?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            Self::recompute_totals(&mut tx, &invoice).await?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to commit: {}", e)))?;

        timer.observe_duration();

        Ok(deleted)
    }

    // -------------------------------------------------------------------------
    // Activity Log Operations
    // -------------------------------------------------------------------------

    /// Append an activity entry. Entries are never updated or deleted.
    #[instrument(skip(self, input), fields(action = %input.action))]
    pub async fn record_activity(&self, input: &NewActivityLog) -> Result<ActivityLog, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["record_activity"])
            .start_timer();

        let log_id = Uuid::new_v4();
        let entry = sqlx::query_as::<_, ActivityLog>(
            r#"
            INSERT INTO activity_logs (log_id, account_id, action, metadata)
            VALUES ($1, $2, $3, $4)
            RETURNING log_id, account_id, action, metadata, created_utc
            "#,
        )
        .bind(log_id)
        .bind(input.account_id)
        .bind(&input.action)
        .bind(&input.metadata)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to record activity: {}", e))
        })?;

        timer.observe_duration();

        Ok(entry)
    }

    /// Get an activity entry by ID.
    #[instrument(skip(self), fields(log_id = %log_id))]
    pub async fn get_activity(&self, log_id: Uuid) -> Result<Option<ActivityLog>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_activity"])
            .start_timer();

        let entry = sqlx::query_as::<_, ActivityLog>(
            r#"
            SELECT log_id, account_id, action, metadata, created_utc
            FROM activity_logs
            WHERE log_id = $1
            "#,
        )
        .bind(log_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get activity: {}", e)))?;

        timer.observe_duration();

        Ok(entry)
    }

    /// List activity entries, newest first, optionally for one account.
    #[instrument(skip(self))]
    pub async fn list_activity(
        &self,
        account_id: Option<Uuid>,
        page_size: i32,
    ) -> Result<Vec<ActivityLog>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_activity"])
            .start_timer();

        let limit = page_size.clamp(1, 100) as i64;
        let entries = sqlx::query_as::<_, ActivityLog>(
            r#"
            SELECT log_id, account_id, action, metadata, created_utc
            FROM activity_logs
            WHERE ($1::uuid IS NULL OR account_id = $1)
            ORDER BY created_utc DESC
            LIMIT $2
            "#,
        )
        .bind(account_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list activity: {}", e)))?;

        timer.observe_duration();

        Ok(entries)
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    async fn begin(&self) -> Result<Transaction<'_, Postgres>, AppError> {
        self.pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to begin tx: {}", e)))
    }

    /// Take the per-invoice write lock. Concurrent writers queue here.
    async fn lock_invoice(
        tx: &mut Transaction<'_, Postgres>,
        invoice_id: Uuid,
    ) -> Result<Option<Invoice>, AppError> {
        sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE invoice_id = $1 FOR UPDATE"
        ))
        .bind(invoice_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to lock invoice: {}", e)))
    }

    async fn fetch_items(
        tx: &mut Transaction<'_, Postgres>,
        invoice_id: Uuid,
    ) -> Result<Vec<InvoiceItem>, AppError> {
        sqlx::query_as::<_, InvoiceItem>(&format!(
            r#"
            SELECT {ITEM_COLUMNS}
            FROM invoice_items
            WHERE invoice_id = $1
            ORDER BY sort_order, created_utc
            "#
        ))
        .bind(invoice_id)
        .fetch_all(&mut **tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to fetch items: {}", e)))
    }

    /// Rewrite the derived invoice fields from its current items and
    /// payments. Must run inside the transaction holding the row lock.
    async fn recompute_totals(
        tx: &mut Transaction<'_, Postgres>,
        invoice: &Invoice,
    ) -> Result<Invoice, AppError> {
        let items = Self::fetch_items(tx, invoice.invoice_id).await?;
        let lines: Vec<LineInput> = items
            .iter()
            .map(|item| LineInput {
                quantity: item.quantity,
                rate: item.rate,
                tax_percent: item.tax_percent,
                discount_percent: item.discount_percent,
            })
            .collect();

        // Overrides live on the invoice row; re-read nothing else.
        let current = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE invoice_id = $1"
        ))
        .bind(invoice.invoice_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to reload invoice: {}", e)))?;

        let totals = domain::compute_totals(
            &lines,
            current.jurisdiction_enum(),
            current.tds_percent,
            current.discount_total,
        )?;

        let paid: Decimal = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount), 0) FROM payments WHERE invoice_id = $1",
        )
        .bind(invoice.invoice_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to sum payments: {}", e)))?;

        let balance = domain::balance_due(totals.total, &[paid]);

        let updated = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            UPDATE invoices
            SET subtotal = $2, cgst = $3, sgst = $4, igst = $5, tds = $6,
                total = $7, balance_due = $8
            WHERE invoice_id = $1
            RETURNING {INVOICE_COLUMNS}
            "#
        ))
        .bind(invoice.invoice_id)
        .bind(totals.subtotal)
        .bind(totals.cgst)
        .bind(totals.sgst)
        .bind(totals.igst)
        .bind(totals.tds)
        .bind(totals.total)
        .bind(balance)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to store recomputed totals: {}", e))
        })?;

        Ok(updated)
    }
}
