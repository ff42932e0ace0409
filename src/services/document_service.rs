// src/services/document_service.rs

use genpdf::{elements, style, Element};
use image::Luma;
use qrcode::QrCode;

use crate::{common::error::AppError, models::payment::PaymentDeclaration};

const AGENCY_NAME: &str = "ALO IMMIGRATION";
const FONT_FAMILY: &str = "Roboto";

fn render_error(e: impl std::fmt::Display) -> AppError {
    AppError::InternalServerError(anyhow::Error::msg(e.to_string()))
}

#[derive(Clone)]
pub struct DocumentService {
    fonts_dir: String,
}

impl DocumentService {
    pub fn new(fonts_dir: String) -> Self {
        Self { fonts_dir }
    }

    /// Fatura em PDF de um pagamento confirmado (QR code = número da fatura).
    pub fn render_invoice(&self, payment: &PaymentDeclaration) -> Result<Vec<u8>, AppError> {
        let invoice_number = payment
            .invoice_number
            .as_deref()
            .ok_or(AppError::NotFound("invoice"))?;

        // 1. Fonte (pasta configurada em FONTS_DIR)
        let font_family = genpdf::fonts::from_files(&self.fonts_dir, FONT_FAMILY, None)
            .map_err(|_| AppError::FontNotFound(format!("Fonte não encontrada em {}", self.fonts_dir)))?;

        let mut doc = genpdf::Document::new(font_family);
        doc.set_title(format!("Facture {invoice_number}"));
        let mut decorator = genpdf::SimplePageDecorator::new();
        decorator.set_margins(10);
        doc.set_page_decorator(decorator);

        // --- CABEÇALHO ---
        doc.push(
            elements::Paragraph::new(AGENCY_NAME)
                .styled(style::Style::new().bold().with_font_size(18)),
        );
        doc.push(elements::Break::new(1.5));
        doc.push(
            elements::Paragraph::new(format!("FACTURE N° {invoice_number}"))
                .styled(style::Style::new().bold().with_font_size(14)),
        );

        let issued_at = payment.confirmed_at.unwrap_or(payment.declared_at);
        doc.push(elements::Paragraph::new(format!("Date : {}", issued_at.format("%d/%m/%Y"))));
        doc.push(elements::Paragraph::new(format!("Client : {}", payment.client_name)));
        doc.push(elements::Break::new(2));

        // --- DETALHE ---
        let mut table = elements::TableLayout::new(vec![4, 2, 2]);
        table.set_cell_decorator(elements::FrameCellDecorator::new(true, true, false));

        let style_bold = style::Style::new().bold();
        table
            .row()
            .element(elements::Paragraph::new("Description").styled(style_bold))
            .element(elements::Paragraph::new("Mode de paiement").styled(style_bold))
            .element(elements::Paragraph::new("Montant").styled(style_bold))
            .push()
            .map_err(render_error)?;

        table
            .row()
            .element(elements::Paragraph::new(payment.description.clone()))
            .element(elements::Paragraph::new(payment.payment_method.clone()))
            .element(elements::Paragraph::new(format!("{:.2} {}", payment.amount, payment.currency)))
            .push()
            .map_err(render_error)?;

        doc.push(table);
        doc.push(elements::Break::new(2));

        let mut total = elements::Paragraph::new(format!(
            "TOTAL PAYÉ : {:.2} {}",
            payment.amount, payment.currency
        ));
        total.set_alignment(genpdf::Alignment::Right);
        doc.push(total.styled(style::Style::new().bold().with_font_size(12)));
        doc.push(elements::Break::new(2));

        // --- QR CODE ---
        let code = QrCode::new(invoice_number.as_bytes()).map_err(render_error)?;
        let image_buffer = code.render::<Luma<u8>>().build();
        let dynamic_image = image::DynamicImage::ImageLuma8(image_buffer);

        let pdf_image = elements::Image::from_dynamic_image(dynamic_image)
            .map_err(render_error)?
            .with_scale(genpdf::Scale::new(0.5, 0.5));
        doc.push(pdf_image);

        doc.push(elements::Break::new(1));
        doc.push(
            elements::Paragraph::new("Merci de votre confiance.")
                .styled(style::Style::new().italic().with_font_size(8)),
        );

        // 2. Renderiza em memória
        let mut buffer = Vec::new();
        doc.render(&mut buffer).map_err(render_error)?;

        Ok(buffer)
    }
}
