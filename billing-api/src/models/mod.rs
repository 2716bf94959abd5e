//! Domain models for billing-api.

mod account;
mod activity_log;
mod bank_detail;
mod client;
mod company;
mod invoice;
mod invoice_item;
mod payment;

pub use account::{Account, NewAccount, RefreshTokenRecord};
pub use activity_log::{ActivityLog, NewActivityLog};
pub use bank_detail::{BankDetail, CreateBankDetail, UpdateBankDetail};
pub use client::{Client, CreateClient, UpdateClient};
pub use company::{Company, CreateCompany, UpdateCompany};
pub use invoice::{
    CreateInvoice, Invoice, InvoiceStatus, Jurisdiction, ListInvoicesFilter, UpdateInvoice,
};
pub use invoice_item::{CreateInvoiceItem, InvoiceItem, UpdateInvoiceItem};
pub use payment::{CreatePayment, Payment, UpdatePayment};
